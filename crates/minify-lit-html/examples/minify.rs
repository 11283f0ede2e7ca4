//! Minifies the lit-html templates of a file and prints the result.
//!
//! ```sh
//! cargo run --example minify -- src/my-component.ts
//! ```

use minify_lit_html::{MinifyLitHtml, PluginOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args().nth(1).ok_or("usage: minify <file>")?;
    let code = std::fs::read_to_string(&path)?;

    let plugin = MinifyLitHtml::new(PluginOptions::default())?;
    match plugin.transform(&code, &path).await {
        Some(result) => {
            println!("{}", result.code);
            eprintln!("map: {}", result.map.to_json()?);
        }
        None => eprintln!("{path}: not handled by the plugin"),
    }

    Ok(())
}
