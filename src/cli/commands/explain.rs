//! Explain command - ask the tutor about a word.

use crate::app::App;
use crate::cli::{preflight, Output};
use crate::config::Settings;
use anyhow::Result;

pub async fn run_explain(word: &str, sentence: &str, settings: Settings) -> Result<()> {
    preflight::check_llm(&settings)?;
    let app = App::new(settings)?;

    let spinner = Output::spinner(&format!("Explaining \"{}\"...", word));
    let explanation = app.tutor.explain_word(word, sentence).await;
    spinner.finish_and_clear();

    println!("{}", explanation?);
    Ok(())
}
