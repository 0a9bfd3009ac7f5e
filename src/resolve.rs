use crate::error::{Error, Result};

/// The closed set of placeholders a CDN URL template may reference.
///
/// Each placeholder is accepted in two bracket styles, `%PKG%` and `{pkg}`,
/// matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Package,
    PathType,
    Version,
    Name,
}

impl Placeholder {
    /// Substitution order.
    pub const ORDER: [Placeholder; 4] = [
        Placeholder::Package,
        Placeholder::PathType,
        Placeholder::Version,
        Placeholder::Name,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Placeholder::Package => "PKG",
            Placeholder::PathType => "TYPE",
            Placeholder::Version => "VER",
            Placeholder::Name => "NAME",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        Self::ORDER
            .into_iter()
            .find(|p| p.token().eq_ignore_ascii_case(token))
    }
}

/// Substitutes placeholder values into a URL template.
///
/// A placeholder without a value is removed together with a directly
/// following `/`, so `a/%VER%/b` and `a/%VER%b` both become `a/b`.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    pub package: &'a str,
    pub path: Option<&'a str>,
    pub version: Option<&'a str>,
    pub name: &'a str,
}

impl<'a> Resolver<'a> {
    pub fn new(package: &'a str, name: &'a str) -> Self {
        Self {
            package,
            path: None,
            version: None,
            name,
        }
    }

    pub fn with_path(mut self, path: Option<&'a str>) -> Self {
        self.path = path.filter(|p| !p.is_empty());
        self
    }

    pub fn with_version(mut self, version: Option<&'a str>) -> Self {
        self.version = version.filter(|v| !v.is_empty());
        self
    }

    pub fn resolve(&self, template: &str) -> Result<String> {
        validate_template(template)?;

        let mut out = template.to_string();
        for p in Placeholder::ORDER {
            out = replace_placeholder(&out, p, self.value(p));
        }
        Ok(out)
    }

    fn value(&self, p: Placeholder) -> Option<&str> {
        match p {
            Placeholder::Package => Some(self.package),
            Placeholder::PathType => self.path,
            Placeholder::Version => self.version,
            Placeholder::Name => Some(self.name),
        }
    }
}

/// Rejects unclosed `{` brackets and unknown `{name}` placeholders.
///
/// A `%NAME%` run is a placeholder only when it names a known one; anything
/// else between percent signs is copied literally, so percent-encoded URLs
/// such as `caf%C3%A9` or `%EF%BB` pass through.
pub fn validate_template(template: &str) -> Result<()> {
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                let Some(len) = template[i + 1..].find('}') else {
                    return Err(Error::Configuration(format!(
                        "unclosed placeholder in URL template: {template}"
                    )));
                };
                let token = &template[i + 1..i + 1 + len];
                if Placeholder::parse(token).is_none() {
                    return Err(Error::Configuration(format!(
                        "unknown placeholder {{{token}}} in URL template: {template}"
                    )));
                }
                i += len + 2;
            }
            _ => i += 1,
        }
    }

    Ok(())
}

fn percent_token(input: &str, start: usize) -> Option<&str> {
    let rest = &input[start + 1..];
    let len = rest.find('%')?;
    let token = &rest[..len];
    Placeholder::parse(token).map(|_| token)
}

fn brace_token(input: &str, start: usize) -> Option<&str> {
    let rest = &input[start + 1..];
    let len = rest.find('}')?;
    Some(&rest[..len])
}

fn replace_placeholder(input: &str, p: Placeholder, value: Option<&str>) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        let token = match bytes[i] {
            b'%' => percent_token(input, i),
            b'{' => brace_token(input, i),
            _ => None,
        };

        match token.filter(|t| Placeholder::parse(t) == Some(p)) {
            Some(t) => {
                out.push_str(&input[copied..i]);
                let mut end = i + t.len() + 2;
                match value {
                    Some(v) => out.push_str(v),
                    None => {
                        if bytes.get(end) == Some(&b'/') {
                            end += 1;
                        }
                    }
                }
                copied = end;
                i = end;
            }
            None => i += 1,
        }
    }

    out.push_str(&input[copied..]);
    out
}
