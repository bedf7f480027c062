use nht_scripts::logging;
use nht_scripts::readme::RenderReadme;

fn main() -> anyhow::Result<()> {
    let cmd: RenderReadme = argh::from_env();
    logging::init(cmd.log_level)?;
    cmd.run()?;
    Ok(())
}
