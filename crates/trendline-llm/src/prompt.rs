//! Prompt assembly for narrative trend generation.

use crate::llm::{GenerationRequest, Message, Role};
use crate::validate::{MAX_PHASES, MIN_PHASES, MIN_SOURCE_DIGEST_CHARS};
use trendline_ingest::{IngestionResult, ReferenceKind};

/// Appended to the user turn on the retry attempt.
pub const STRICT_JSON_REMINDER: &str = "Your previous response could not be parsed as JSON. \
Return ONLY one valid JSON object matching the schema above. \
Do NOT include markdown fences, comments, or any text before or after the object.";

const PREVIEW_CHARS: usize = 2_000;

/// System instructions describing the payload contract.
pub fn system_instructions() -> String {
    format!(
        r#"You are a narrative trend analyst. Given a topic, describe how it evolved as a sequence of phases that can be drawn as a chart.

Respond with ONE JSON object and nothing else. Schema:
{{
  "subject": string,            // the primary subject (the stronger side when comparing two)
  "metric": string,             // what is being measured
  "timeframe": string,          // e.g. "2015-2025"
  "data_cutoff": string,        // latest period your knowledge covers
  "source_digest": string,      // how the supplied references shaped this answer
  "title": string,
  "summary": string,
  "outlook": string,
  "y_axis": {{ "label": string, "unit": string|null, "kind": "subjective"|"objective", "description": string }},
  "x_axis_label": string,
  "phases": [                   // {MIN_PHASES} to {MAX_PHASES} entries, in chronological order
    {{
      "start_label": string,    // a year ("2019"), quarter ("2021 Q3"), or ordinal ("Season 2")
      "end_label": string,
      "open": number, "high": number, "low": number, "close": number,
      "label": string,
      "zone": "realized"|"projected",
      "key_events": [{{ "time": string, "description": string, "impact": "positive"|"negative"|"neutral" }}],
      "relation_note": string
    }}
  ],
  "secondary": {{ "subject": string, "metric": string, "y_axis": {{...}}, "phases": [...] }} | null,
  "notes": [string]
}}

Rules:
- When y_axis.kind is "subjective", every value is a score between 0 and 100.
- When y_axis.kind is "objective", values are real measurements in y_axis.unit.
- A phase's end_label should equal the next phase's start_label, and its close the next open, unless there was a genuine gap or jump.
- Use "projected" only for phases after the data cutoff.
- Only include "secondary" for a genuine counterpart series."#
    )
}

/// The user turn: topic plus any ingested references.
pub fn user_prompt(prompt: &str, ingestion: &IngestionResult) -> String {
    let mut out = format!("Topic: {}\n", prompt.trim());

    if ingestion.entries.is_empty() {
        return out;
    }

    out.push_str("\nReference material supplied by the user:\n");
    for (i, entry) in ingestion.entries.iter().enumerate() {
        let kind = match entry.kind {
            ReferenceKind::Text => "note",
            ReferenceKind::File => "file",
            ReferenceKind::Url => "link",
        };
        out.push_str(&format!(
            "\n[{}] {kind}: {}\n{}\n",
            i + 1,
            entry.source,
            entry.content
        ));
    }
    out.push_str(&format!(
        "\nGround the phases in this material where it applies. \
\"source_digest\" must summarise, in at least {MIN_SOURCE_DIGEST_CHARS} characters, \
which references you used and how.\n"
    ));
    out
}

/// Request for attempt 0.
pub fn initial_request(prompt: &str, ingestion: &IngestionResult) -> GenerationRequest {
    GenerationRequest::new(system_instructions()).with_user(user_prompt(prompt, ingestion))
}

/// Copy of `request` whose final user turn carries the strict-JSON reminder
/// and, when available, a preview of the output that failed to parse.
pub fn retry_request(request: &GenerationRequest, previous_output: Option<&str>) -> GenerationRequest {
    let mut retry = request.clone();
    let mut reminder = format!("\n\n---\n{STRICT_JSON_REMINDER}\n");
    if let Some(previous) = previous_output.filter(|p| !p.trim().is_empty()) {
        reminder.push_str("\nUnparseable response (truncated):\n");
        reminder.push_str(&truncate_preview(previous, PREVIEW_CHARS));
        reminder.push('\n');
    }

    match retry
        .messages
        .iter_mut()
        .rev()
        .find(|m| m.role == Role::User)
    {
        Some(last) => last.content.push_str(&reminder),
        None => retry.messages.push(Message::user(reminder.trim_start())),
    }
    retry
}

pub(crate) fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((idx, _)) => format!("{}…", &text[..idx]),
    }
}
