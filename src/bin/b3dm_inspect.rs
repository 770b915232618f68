use b3dm_decoder::cli::run_inspect_cli;

fn main() -> anyhow::Result<()> {
    run_inspect_cli()
}
