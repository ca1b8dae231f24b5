use anyhow::Result;

fn main() -> Result<()> {
    ocicheck::cli::run(ocicheck::cli::CliMode::NsPath)
}
