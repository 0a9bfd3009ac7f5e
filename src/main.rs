use anyhow::{Context as _, Result};
use clap::Parser;
use std::{io::Write as _, sync::Arc};

use scriptrepo::{cli::Args, report, Bundle, Config, Emitter, Locator};

fn main() -> Result<()> {
    let args = Args::parse();
    scriptrepo::logging::init(args.verbose);

    let cfg = Config::load(args.config.as_deref())?;

    let locator = Arc::new(Locator::new());
    let mut ctx = cfg.build_context(Arc::clone(&locator))?;
    for dir in &args.dirs {
        ctx.add_dir(dir);
    }

    let mut stdout = std::io::stdout().lock();

    if args.list {
        for name in locator.available()? {
            writeln!(stdout, "{name}")?;
        }
        return Ok(());
    }

    if !args.no_defaults {
        ctx.include_defaults()?;
    }
    for name in &args.units {
        ctx.include(name)
            .with_context(|| format!("failed to include unit {name}"))?;
    }
    if !args.no_defaults {
        ctx.include_assets()?;
    }

    let bundle = Bundle::collect(&mut ctx);

    let rep = report::build_report(&ctx, &bundle, args.report);
    if !rep.is_empty() {
        eprint!("{rep}");
    }

    let out = Emitter::new(args.format, ctx.eol()).render(&bundle)?;
    stdout.write_all(out.as_bytes())?;
    Ok(())
}
