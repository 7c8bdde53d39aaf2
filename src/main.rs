fn main() -> anyhow::Result<()> {
    regolith_filters::cli::run()
}
