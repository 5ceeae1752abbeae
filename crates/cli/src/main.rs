fn main() -> anyhow::Result<()> {
    symserve_cli::run()
}
