//! Terminal chat over local PDF files.
//!
//! Runs the same upload → process → ask flow as the web page, reading
//! questions from stdin. `:history` prints the transcript, `:quit` exits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use super::output::Output;
use crate::session::{Pipeline, Session};
use crate::types::{AppError, Document, Result};

/// Read each path into a [`Document`] named after its file name
pub async fn load_files(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read(path).await.map_err(|e| {
            AppError::InvalidInput(format!("Cannot read {}: {}", path.display(), e))
        })?;
        documents.push(Document::new(display_name(path), content));
    }
    Ok(documents)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Index `paths` and answer questions from stdin until EOF or `:quit`
pub async fn run(pipeline: Arc<Pipeline>, paths: &[PathBuf], output: &Output) -> Result<()> {
    let mut session = Session::new(pipeline);
    let documents = load_files(paths).await?;
    session.on_upload(documents);

    output.info("Processing PDFs...");
    let report = session.on_process().await?;
    output.success(&format!(
        "PDFs processed successfully! {} documents, {} pages, {} chunks",
        report.documents, report.pages, report.chunks
    ));
    for skipped in &report.skipped {
        output.warning(&format!("Skipped {}: {}", skipped.document_id, skipped.reason));
    }
    output.hint("Ask a question, :history for the transcript, :quit to exit");

    let stdin = BufReader::new(tokio::io::stdin());
    converse(&mut session, stdin, output).await
}

/// Question loop over any line source
pub async fn converse<R>(session: &mut Session, input: R, output: &Output) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        output.prompt();
        let line = match lines
            .next_line()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read input: {}", e)))?
        {
            Some(line) => line,
            None => break,
        };

        match line.trim() {
            "" => continue,
            ":quit" | ":q" | "exit" => break,
            ":history" => {
                output.header("Transcript");
                for turn in session.transcript() {
                    output.kv(&turn.asked_at.format("%H:%M:%S").to_string(), &turn.question);
                    output.list_item(&turn.answer);
                }
                output.newline();
            }
            question => match session.on_ask(question).await {
                Ok(answer) => {
                    let sources: Vec<String> = answer
                        .sources
                        .iter()
                        .map(|s| format!("{} p.{}", s.document_id, s.page))
                        .collect();
                    output.answer(&answer.text, &sources);
                }
                // A failed question leaves the session usable
                Err(e) => output.error(&e.to_string()),
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_files_uses_file_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let docs = load_files(&[path]).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "notes.pdf");
        assert_eq!(docs[0].content, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_load_files_missing() {
        let result = load_files(&[PathBuf::from("/definitely/not/here.pdf")]).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
