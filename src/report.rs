use crate::{asset::AssetKind, cli, context::BuildContext, emit::Bundle};

pub fn build_report(ctx: &BuildContext, bundle: &Bundle, mode: cli::ReportMode) -> String {
    match mode {
        cli::ReportMode::Off => String::new(),
        cli::ReportMode::Summary => summary(ctx, bundle),
        cli::ReportMode::Full => full(ctx, bundle),
    }
}

fn summary(ctx: &BuildContext, bundle: &Bundle) -> String {
    let mut out = String::new();

    out.push_str("scriptrepo report (summary)\n");
    out.push_str("===========================\n");
    out.push_str(&format!("root: {}\n", ctx.root()));
    out.push_str(&format!("eol: {:?}\n", ctx.eol()));

    let dirs = ctx.locator().dirs();
    out.push_str(&format!("dirs: {}\n", dirs.len()));
    for d in &dirs {
        out.push_str(&format!("  - {}\n", d.display()));
    }

    out.push_str(&format!("defaults: {:?}\n", ctx.defaults()));

    out.push_str(&format!("\nincluded: {}\n", ctx.included().len()));
    for name in ctx.included() {
        match ctx.unit(name) {
            Some(u) => out.push_str(&format!(
                "  - {} (repository={}, position={})\n",
                name,
                u.repository(),
                u.position()
            )),
            None => out.push_str(&format!("  - {name}\n")),
        }
    }

    let repos: Vec<&str> = ctx.repositories().map(|r| r.name()).collect();
    out.push_str(&format!("\nrepositories: {}\n", repos.join(", ")));
    out.push_str(&format!("content: {} bytes\n", bundle.content.len()));

    out.push_str("\nassets\n");
    for kind in AssetKind::ALL {
        out.push_str(&format!("  {kind}: {}\n", bundle.urls(kind).len()));
    }

    out.push_str(&format!("\ncdn providers: {}\n", ctx.cdn().len()));

    out
}

fn full(ctx: &BuildContext, bundle: &Bundle) -> String {
    let mut out = summary(ctx, bundle);

    out.push_str("\nunits\n");
    for name in ctx.included() {
        if let Some(u) = ctx.unit(name) {
            out.push_str(&format!("{u:#?}\n"));
        }
    }

    out.push_str("\nasset urls\n");
    for (kind, urls) in &bundle.assets {
        for url in urls {
            out.push_str(&format!("  [{kind}] {url}\n"));
        }
    }

    out.push_str("\ncdn\n");
    for p in ctx.cdn().providers() {
        out.push_str(&format!("{p:#?}\n"));
    }

    out
}
