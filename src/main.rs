use infobutton::{
    app::App,
    cli::{CheckConfigArgs, Command},
    config::{loader, Config},
    Result,
};

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    match Command::from_env() {
        Command::Run(opts) => App::from_options(opts)?.run(),
        Command::CheckConfig(args) => check_config(args),
    }
}

fn check_config(args: CheckConfigArgs) -> Result<()> {
    let path = match args.config {
        Some(path) => path,
        None => loader::default_path()?,
    };
    let config = Config::load_from_path(&path)?;
    println!("# {} (ok)", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}
