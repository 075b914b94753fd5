use serde::{Deserialize, Serialize};

/// A source document: extracted text plus provenance metadata.
///
/// Created once at index-build time and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Provenance carried from the document onto every chunk, so retrieved
/// context can be traced back to its source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub path: String,
    pub file_name: Option<String>,
}

impl Document {
    pub fn generate_id(path: &str) -> String {
        use sha2::{Digest, Sha256};
        let hash = Sha256::digest(path.as_bytes());
        hex::encode(&hash[..16])
    }

    pub fn new(text: String, metadata: DocumentMetadata) -> Self {
        let id = Self::generate_id(&metadata.path);
        Self { id, text, metadata }
    }
}

/// A contiguous span of a document's text, bounded by the configured size
/// budget and annotated with the source document's metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub text: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub metadata: DocumentMetadata,
}

impl DocumentChunk {
    pub fn generate_id(document_id: &str, chunk_index: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", document_id, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn from_document(
        document: &Document,
        text: String,
        chunk_index: u32,
        total_chunks: u32,
    ) -> Self {
        let id = Self::generate_id(&document.id, chunk_index);
        Self {
            id,
            document_id: document.id.clone(),
            text,
            chunk_index,
            total_chunks,
            metadata: document.metadata.clone(),
        }
    }
}
