use std::path::PathBuf;

use crate::config::target::oversized_bytes_from_mb;
use crate::corpus::{generate_all, write_corpus, CorpusOptions};
use crate::errors::KbFuzzError;
use crate::utils::format_bytes;
use super::commands::GenerateArgs;

pub async fn handle_generate(args: GenerateArgs) -> Result<(), KbFuzzError> {
    let options = CorpusOptions { oversized_bytes: oversized_bytes_from_mb(args.oversized_mb)? };
    let dir = PathBuf::from(&args.output);
    let files = generate_all(&options);
    write_corpus(&dir, &files).await?;

    for file in &files {
        println!("  {:<40} {:>10}  {:?}", file.name, format_bytes(file.bytes.len() as u64), file.defect);
    }
    println!("Generated {} files in {}", files.len(), dir.display());
    Ok(())
}
