use mediaload::sim;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mediaload=info".parse()?),
        )
        .init();

    match sim::maybe_parse_args()? {
        Some(args) => {
            let code = sim::run_simulation(args)?;
            std::process::exit(code);
        }
        None => {
            println!("{}", sim::USAGE);
            Ok(())
        }
    }
}
