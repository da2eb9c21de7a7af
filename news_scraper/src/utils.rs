use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::ArticleRecord;

pub fn save_json(articles: &[ArticleRecord], path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(path)?;
    file.write_all(serde_json::to_string_pretty(articles)?.as_bytes())?;
    info!(path = %path.display(), count = articles.len(), "wrote articles");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_pretty_json_array() {
        let path = std::env::temp_dir().join(format!("news_scraper_{}.json", std::process::id()));
        let articles = vec![ArticleRecord::new("A".into(), "https://x/a".into())];

        save_json(&articles, &path).unwrap();
        let back: Vec<ArticleRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back, articles);
    }
}
