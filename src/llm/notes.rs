use super::{create_llm, ChatMessage, Llm, LlmConfig};
use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

/// Generates tutorial-style notes from a transcript through a local LLM
pub struct NoteGenerator {
    llm: Box<dyn Llm>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl NoteGenerator {
    /// Create a new note generator, failing fast if the LLM server is unreachable
    pub async fn new(config: LlmConfig, chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let llm = create_llm(&config)?;

        if !llm.is_available().await {
            return Err(anyhow!(
                "LLM provider {:?} is not available at {} - is the server running?",
                config.provider,
                config.endpoint
            ));
        }

        info!(
            "✅ Note generator initialized with {:?} provider (model: {})",
            config.provider, config.model
        );

        Ok(Self {
            llm,
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split transcript text into overlapping chunks sized for the model context
    pub fn chunk_transcript(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }

        chunks
    }

    /// Generate a complete notes document from the transcript text
    pub async fn generate(&self, transcript_text: &str) -> Result<String> {
        let chunks = self.chunk_transcript(transcript_text);
        info!("📝 Split transcript into {} chunk(s) for note generation", chunks.len());

        let mut notes = String::from("# Detailed Video Tutorial\n");

        for (i, chunk) in chunks.iter().enumerate() {
            info!("🧠 Generating notes for part {}/{}...", i + 1, chunks.len());

            let messages = vec![ChatMessage::user(Self::chunk_prompt(chunk))];

            match self.llm.chat(messages).await {
                Ok(response) => {
                    debug!(
                        "Notes for part {} generated (tokens: {:?})",
                        i + 1,
                        response.tokens_used
                    );
                    notes.push_str(&format!("\n\n## Part {}\n\n{}", i + 1, response.content.trim()));
                }
                Err(e) => {
                    // A single failed chunk should not lose the rest of the document
                    warn!("Failed to generate notes for part {}: {}", i + 1, e);
                    notes.push_str(&format!(
                        "\n\n## Part {} (Error)\n\n[Failed to generate notes for this section: {}]\n",
                        i + 1,
                        e
                    ));
                }
            }
        }

        Ok(notes)
    }

    /// Prompt wrapping a single transcript chunk
    fn chunk_prompt(chunk: &str) -> String {
        format!(
            "You are a technical documenter. Your task is to convert the following video \
            transcript segment into a detailed Step-by-Step Tutorial Guide.\n\n\
            **Rules:**\n\
            1. RETAIN ALL DETAILS: Do not summarize into vague points. Capture every click, \
            command, setting, and code snippet.\n\
            2. STRUCTURE: Use clear headings (##), bullet points, and code blocks.\n\
            3. CONTEXT: If a step is a continuation from the previous part, continue logically.\n\
            4. NO FLUFF: Remove conversational filler (e.g., \"Um\", \"So guys\", \"Welcome back\"). \
            Keep it strictly instructional.\n\n\
            **Transcript Segment:**\n{}\n\n\
            **Detailed Tutorial:**",
            chunk
        )
    }
}
