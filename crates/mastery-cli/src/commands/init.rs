//! The `mastery init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("mastery.toml").exists() {
        println!("mastery.toml already exists, skipping.");
    } else {
        std::fs::write("mastery.toml", SAMPLE_CONFIG)?;
        println!("Created mastery.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set default_user in mastery.toml");
    println!("  2. Run: mastery record --topics fractions,ratios --score 72");
    println!("  3. Run: mastery scores");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mastery configuration

default_user = "me"

[scoring]
half_life_days = 90.0

[scoring.tier_scores]
strong = 90.0
moderate = 60.0
weak = 25.0

[store]
type = "file"
path = "./mastery-data"

# Remote document store:
# [store]
# type = "http"
# base_url = "https://example.com/api"
# access_token = "${MASTERY_ACCESS_TOKEN}"
# timeout_secs = 30
"#;
