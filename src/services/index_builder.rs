//! Startup-time index construction: load corpus, chunk, embed, build.

use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use walkdir::WalkDir;

use crate::error::{CorpusError, IndexError};
use crate::models::{Config, Document, DocumentChunk, DocumentMetadata};
use crate::services::chunker::SentenceChunker;
use crate::services::embedding::EmbeddingProvider;
use crate::services::vector_index::VectorIndex;

/// Extensions treated as extracted corpus text.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "text"];

/// Load pre-extracted corpus text from a file or a directory tree.
/// Directory entries are visited in file-name order so document (and hence
/// record) ordering is reproducible across runs.
pub fn load_corpus(raw_file_path: &Path) -> Result<Vec<Document>, CorpusError> {
    let mut documents = Vec::new();

    if raw_file_path.is_file() {
        documents.push(read_document(raw_file_path)?);
    } else if raw_file_path.is_dir() {
        for entry in WalkDir::new(raw_file_path)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = entry.map_err(|e| CorpusError::WalkError(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let extension = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase);
            if extension.is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.as_str())) {
                documents.push(read_document(entry.path())?);
            }
        }
    } else {
        return Err(CorpusError::NoDocuments(
            raw_file_path.display().to_string(),
        ));
    }

    if documents.is_empty() {
        return Err(CorpusError::NoDocuments(
            raw_file_path.display().to_string(),
        ));
    }
    Ok(documents)
}

fn read_document(path: &Path) -> Result<Document, CorpusError> {
    let text = std::fs::read_to_string(path)?;
    let metadata = DocumentMetadata {
        path: path.display().to_string(),
        file_name: path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string),
    };
    Ok(Document::new(text, metadata))
}

/// Build the immutable vector index shared by all requests: load the corpus,
/// chunk each document, embed the chunks with the shared provider, and
/// bulk-load the index. Runs once per process start.
pub fn build_index(
    config: &Config,
    embedder: &Arc<dyn EmbeddingProvider>,
    show_progress: bool,
) -> Result<VectorIndex, IndexError> {
    let documents = load_corpus(Path::new(&config.document.raw_file_path))?;
    let chunker = SentenceChunker::new(config.indexing.chunk_size as usize);
    let chunks: Vec<DocumentChunk> = documents.iter().flat_map(|d| chunker.split(d)).collect();
    info!(
        documents = documents.len(),
        chunks = chunks.len(),
        "corpus chunked"
    );

    let pb = if show_progress {
        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let batch_size = config.embedding.batch_size.max(1) as usize;
    let mut entries = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_documents(&texts)?;
        for (chunk, vector) in batch.iter().zip(vectors) {
            entries.push((chunk.clone(), vector));
        }
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();

    let index = VectorIndex::build(
        config.indexing.collection.clone(),
        embedder.dimension(),
        entries,
    )?;
    info!(
        collection = %config.indexing.collection,
        records = index.len(),
        "vector index built"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbeddingError;
    use std::io::Write;

    struct LengthEmbedder;

    impl EmbeddingProvider for LengthEmbedder {
        fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, 1.0])
                .collect())
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    #[test]
    fn test_load_corpus_single_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        writeln!(file, "Cells are the basic unit of life.").unwrap();
        let documents = load_corpus(file.path()).unwrap();
        assert_eq!(documents.len(), 1);
        assert!(documents[0].text.contains("Cells"));
        assert!(documents[0].metadata.file_name.is_some());
    }

    #[test]
    fn test_load_corpus_directory_ordered_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "Second file.").unwrap();
        std::fs::write(dir.path().join("a.txt"), "First file.").unwrap();
        std::fs::write(dir.path().join("ignore.pdf"), "binary").unwrap();

        let documents = load_corpus(dir.path()).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].metadata.file_name.as_deref(), Some("a.txt"));
        assert_eq!(documents[1].metadata.file_name.as_deref(), Some("b.txt"));
    }

    #[test]
    fn test_load_corpus_missing_path() {
        let result = load_corpus(Path::new("/nonexistent/corpus"));
        assert!(matches!(result, Err(CorpusError::NoDocuments(_))));
    }

    #[test]
    fn test_build_index_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("biology.txt"),
            "Cells are the basic unit of life. Photosynthesis converts light to energy.",
        )
        .unwrap();

        let config = Config {
            document: crate::models::DocumentConfig {
                raw_file_path: dir.path().display().to_string(),
            },
            ..Default::default()
        };
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(LengthEmbedder);
        let index = build_index(&config, &embedder, false).unwrap();

        // Default chunk size holds both sentences in one chunk.
        assert_eq!(index.len(), 1);
        assert_eq!(index.dimension(), 2);
    }
}
