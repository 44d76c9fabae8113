use cvrank_core::config::Settings;
use cvrank_embed::vector_space_from_settings;

fn main() -> anyhow::Result<()> {
    let space = vector_space_from_settings(&Settings::default())?;
    let texts = vec!["pharmacovigilance audit".to_string(), "computer system validation".to_string()];
    let embs = space.embed_batch(&texts)?;
    println!("B={} dim={}", embs.len(), space.dim());
    Ok(())
}
