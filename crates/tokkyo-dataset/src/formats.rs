//! Training record shapes built from pairs and records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokkyo_ingestion::PatentRecord;

use crate::assembler::TrainingPair;
use crate::paragraphs::{Paragraph, ParagraphSplitter};

/// Prefix of the user turn in pair-based formats.
pub const CLAIMS_PROMPT: &str =
    "以下の特許請求の範囲に基づいて、発明を実施するための形態を説明してください：\n\n";

pub const ALPACA_INSTRUCTION: &str =
    "以下の特許請求の範囲に基づいて、発明を実施するための形態を説明してください。";

const PARAGRAPH_SYSTEM_PROMPT: &str = "あなたは特許文書の専門家です。与えられた特許請求の範囲と文脈に基づいて、指定された段落番号の実施形態を生成してください。";

const CONVERSATION_SYSTEM_PROMPT: &str = "あなたは特許文書の専門家です。ユーザーの請求項に基づいて、実施形態を段落ごとに対話形式で生成してください。ユーザーが「次へ」と言ったら次の段落を生成してください。";

/// Characters of each earlier paragraph quoted as context.
const CONTEXT_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System    => "system",
            Role::User      => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

// ── Pair-based formats ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairMetadata {
    pub patent_id: String,
    pub patent_id_synthetic: bool,
    pub claims_section: String,
    pub description_section: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMlRecord {
    pub messages: Vec<Message>,
    pub metadata: PairMetadata,
}

/// Pre-rendered `<|im_start|>` text with flat metadata keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTemplateRecord {
    pub text: String,
    pub patent_id: String,
    pub claims_section: String,
    pub description_section: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlpacaRecord {
    pub instruction: String,
    pub input: String,
    pub output: String,
}

fn pair_messages(pair: &TrainingPair, system_prompt: &str) -> Vec<Message> {
    vec![
        Message::new(Role::System, system_prompt),
        Message::new(Role::User, format!("{CLAIMS_PROMPT}{}", pair.user_message)),
        Message::new(Role::Assistant, pair.assistant_message.as_str()),
    ]
}

pub fn to_chatml(pair: &TrainingPair, system_prompt: &str, created_at: DateTime<Utc>) -> ChatMlRecord {
    ChatMlRecord {
        messages: pair_messages(pair, system_prompt),
        metadata: PairMetadata {
            patent_id: pair.patent_id.clone(),
            patent_id_synthetic: pair.patent_id_synthetic,
            claims_section: pair.claims_section.clone(),
            description_section: pair.description_section.clone(),
            created_at: created_at.to_rfc3339(),
        },
    }
}

pub fn render_chat_template(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("<|im_start|>{}\n{}<|im_end|>", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn to_chat_template(pair: &TrainingPair, system_prompt: &str) -> ChatTemplateRecord {
    ChatTemplateRecord {
        text: render_chat_template(&pair_messages(pair, system_prompt)),
        patent_id: pair.patent_id.clone(),
        claims_section: pair.claims_section.clone(),
        description_section: pair.description_section.clone(),
    }
}

pub fn to_alpaca(pair: &TrainingPair) -> AlpacaRecord {
    AlpacaRecord {
        instruction: ALPACA_INSTRUCTION.to_string(),
        input: pair.user_message.clone(),
        output: pair.assistant_message.clone(),
    }
}

// ── Paragraph-based formats ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphMetadata {
    pub patent_id: String,
    pub paragraph_number: String,
    pub paragraph_index: usize,
    pub total_paragraphs: usize,
    pub claims_count: usize,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphRecord {
    pub messages: Vec<Message>,
    pub metadata: ParagraphMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMetadata {
    pub patent_id: String,
    pub total_paragraphs: usize,
    /// Every message, system prompt included.
    pub conversation_turns: usize,
    pub claims_count: usize,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub messages: Vec<Message>,
    pub metadata: ConversationMetadata,
}

/// `【請求項N】\ntext` blocks in claim-number order, blank-line separated.
pub fn claims_block(record: &PatentRecord) -> String {
    record
        .sorted_claims()
        .into_iter()
        .map(|c| format!("【請求項{}】\n{}", c.claim_number, c.claim_text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn paragraph_turn(p: &Paragraph) -> String {
    format!("{}\n{}", p.number, p.content)
}

/// One record per description paragraph; each prompt quotes the opening of
/// every earlier paragraph.
pub fn paragraph_records(
    record: &PatentRecord,
    splitter: &ParagraphSplitter,
    created_at: DateTime<Utc>,
) -> Vec<ParagraphRecord> {
    let paragraphs = splitter.split(&record.detailed_description).paragraphs;
    let claims = claims_block(record);
    let created_at = created_at.to_rfc3339();

    paragraphs
        .iter()
        .enumerate()
        .map(|(i, paragraph)| {
            let mut context = format!("特許番号: {}", record.id);
            if i > 0 {
                let previous: Vec<String> = paragraphs[..i]
                    .iter()
                    .map(|p| {
                        let preview: String = p.content.chars().take(CONTEXT_PREVIEW_CHARS).collect();
                        format!("{}\n{preview}...", p.number)
                    })
                    .collect();
                context.push_str("\n\n前の段落:\n");
                context.push_str(&previous.join("\n"));
            }
            let user = format!(
                "{context}\n\n【請求項】\n{claims}\n\n上記に基づいて{}の段落を生成してください。",
                paragraph.number
            );

            ParagraphRecord {
                messages: vec![
                    Message::new(Role::System, PARAGRAPH_SYSTEM_PROMPT),
                    Message::new(Role::User, user),
                    Message::new(Role::Assistant, paragraph_turn(paragraph)),
                ],
                metadata: ParagraphMetadata {
                    patent_id: record.id.value.clone(),
                    paragraph_number: paragraph.number.clone(),
                    paragraph_index: i,
                    total_paragraphs: paragraphs.len(),
                    claims_count: record.claims.len(),
                    created_at: created_at.clone(),
                },
            }
        })
        .collect()
}

/// Whole description as a paragraph-by-paragraph dialogue. `None` below two
/// paragraphs.
pub fn conversation_record(
    record: &PatentRecord,
    splitter: &ParagraphSplitter,
    created_at: DateTime<Utc>,
) -> Option<ConversationRecord> {
    let paragraphs = splitter.split(&record.detailed_description).paragraphs;
    if paragraphs.len() < 2 {
        return None;
    }

    let mut messages = vec![
        Message::new(Role::System, CONVERSATION_SYSTEM_PROMPT),
        Message::new(
            Role::User,
            format!(
                "以下の特許請求の範囲に基づいて、実施形態を段落ごとに生成してください：\n\n{}\n\n最初の段落からお願いします。",
                claims_block(record)
            ),
        ),
        Message::new(Role::Assistant, paragraph_turn(&paragraphs[0])),
    ];
    let last = paragraphs.len() - 1;
    for (i, paragraph) in paragraphs.iter().enumerate().skip(1) {
        let request = if i == last { "最後の段落をお願いします。" } else { "次の段落をお願いします。" };
        messages.push(Message::new(Role::User, request));
        messages.push(Message::new(Role::Assistant, paragraph_turn(paragraph)));
    }

    Some(ConversationRecord {
        metadata: ConversationMetadata {
            patent_id: record.id.value.clone(),
            total_paragraphs: paragraphs.len(),
            conversation_turns: messages.len(),
            claims_count: record.claims.len(),
            created_at: created_at.to_rfc3339(),
        },
        messages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokkyo_ingestion::{Claim, PatentId};

    fn pair() -> TrainingPair {
        TrainingPair {
            patent_id: "JP1".into(),
            patent_id_synthetic: false,
            claims_section: "claims".into(),
            description_section: "detailed_description".into(),
            user_message: "【請求項1】基板を備える装置。".into(),
            assistant_message: "【0010】本実施形態の説明。".into(),
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 28, 0, 0, 0).unwrap()
    }

    fn record(description: &str) -> PatentRecord {
        let mut record = PatentRecord::empty(PatentId::authoritative("JP1"));
        record.detailed_description = description.into();
        record.claims = vec![
            Claim { claim_number: "2".into(), claim_text: "請求項1に記載の装置。".into() },
            Claim { claim_number: "1".into(), claim_text: "基板を備える装置。".into() },
        ];
        record
    }

    #[test]
    fn test_chatml_shape() {
        let chatml = to_chatml(&pair(), "SYS", at());
        let roles: Vec<Role> = chatml.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert!(chatml.messages[1].content.starts_with(CLAIMS_PROMPT));
        assert_eq!(chatml.metadata.created_at, "2025-07-28T00:00:00+00:00");

        let json = serde_json::to_value(&chatml).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["metadata"]["claims_section"], "claims");
    }

    #[test]
    fn test_chat_template_text() {
        let rendered = to_chat_template(&pair(), "SYS");
        assert!(rendered.text.starts_with("<|im_start|>system\nSYS<|im_end|>\n<|im_start|>user\n"));
        assert!(rendered.text.ends_with("<|im_start|>assistant\n【0010】本実施形態の説明。<|im_end|>"));
        assert_eq!(rendered.patent_id, "JP1");
    }

    #[test]
    fn test_alpaca_fields() {
        let alpaca = to_alpaca(&pair());
        assert_eq!(alpaca.instruction, ALPACA_INSTRUCTION);
        assert_eq!(alpaca.input, "【請求項1】基板を備える装置。");
        assert_eq!(alpaca.output, "【0010】本実施形態の説明。");
    }

    #[test]
    fn test_claims_block_sorted() {
        assert_eq!(
            claims_block(&record("")),
            "【請求項1】\n基板を備える装置。\n\n【請求項2】\n請求項1に記載の装置。"
        );
    }

    #[test]
    fn test_paragraph_records_carry_context() {
        let splitter = ParagraphSplitter::new().unwrap();
        let records = paragraph_records(&record("【0001】第一。【0002】第二。"), &splitter, at());
        assert_eq!(records.len(), 2);

        assert!(!records[0].messages[1].content.contains("前の段落"));
        assert!(records[1].messages[1].content.contains("前の段落:\n【0001】\n第一。..."));
        assert!(records[1].messages[1].content.ends_with("上記に基づいて【0002】の段落を生成してください。"));
        assert_eq!(records[1].messages[2].content, "【0002】\n第二。");
        assert_eq!(records[1].metadata.paragraph_index, 1);
        assert_eq!(records[1].metadata.total_paragraphs, 2);
        assert_eq!(records[1].metadata.claims_count, 2);
    }

    #[test]
    fn test_conversation_turns() {
        let splitter = ParagraphSplitter::new().unwrap();
        let conv = conversation_record(&record("【0001】一。【0002】二。【0003】三。"), &splitter, at()).unwrap();
        assert_eq!(conv.metadata.conversation_turns, 7);
        assert_eq!(conv.messages[3].content, "次の段落をお願いします。");
        assert_eq!(conv.messages[5].content, "最後の段落をお願いします。");
        assert_eq!(conv.messages[6].content, "【0003】\n三。");

        assert!(conversation_record(&record("【0001】一。"), &splitter, at()).is_none());
    }
}
