// All LLM prompt templates for the trust-assessment workflow.
// Rendered through llm_client::prompts::fill_template.

use crate::llm_client::prompts::fill_template;
use crate::workflow::trust::TrustLevel;

/// Trust question generation. Replace `{conversation_text}`.
pub const TRUST_QUESTIONS_TEMPLATE: &str = r#"You are an assistant that reads informal conversations and finds the points that are ambiguous, easy to misunderstand, or in need of clarification before the parties formalize an agreement.

Based on the conversation transcript below, write 4-5 specific questions that examine those points. Each question should help the parties gauge their confidence, clarity, or agreement on one key topic. Phrase every question neutrally so it can be answered on a scale (for example: how certain, how complete, how fair).

Output ONLY the questions, one per line, numbered or bulleted.
Do NOT add any introduction, explanation, or closing text.

Conversation:
{conversation_text}"#;

/// Trust level summarization. Replace `{questions_and_answers}`.
pub const TRUST_SUMMARY_TEMPLATE: &str = r#"You are an assistant that evaluates the level of trust between parties from their answers to specific questions, each rated on a 1-5 scale.

Scale: 1 = Very Low (confidence/clarity/agreement), 2 = Low, 3 = Medium, 4 = High, 5 = Very High.

Using ONLY the scaled answers below, decide the overall trust level. Weigh the average score, the presence of any low scores, and how important each question's topic is.

Output ONLY one of these three words: High, Medium, or Low.
Do NOT explain or justify the choice.

Questions and Scaled Answers (1-5):
{questions_and_answers}"#;

/// Contract drafting. Replace `{conversation_text}` and `{trust_level}`.
pub const DRAFTING_TEMPLATE: &str = r#"You are a legal drafting assistant that turns informal conversations into preliminary contract outlines. You receive:
1. The original conversation transcript.
2. An assessed trust level (High, Medium, or Low) derived from the parties' answers to trust questions about that conversation.

Write a basic contract draft that reflects the key points and specific details agreed in the conversation. Adapt tone and clauses to the trust level:

- High: a standard, collaborative draft. Outline the core agreement (scope, deliverables, payment, timeline) with balanced clauses. Assume good faith; keep protective clauses minimal and reciprocal.
- Medium: clearer definitions, explicit checkpoints or milestones, payment tied to deliverables, and standard dispute resolution. Add clauses that encourage transparency and verification without being adversarial.
- Low: strict, protective clauses. Emphasize verification, consider upfront payment or escrow, set specific penalties for delay or non-performance, define breach precisely, and prefer formal dispute resolution such as arbitration. Address every obligation and risk explicitly.

HARD RULES:
1. EXTRACT AND INSERT DETAILS: find in the transcript the names of the parties, every figure discussed (amounts such as $5000, rates such as 6%), all dates and timelines (such as "within 6 months"), and the concrete scope or deliverables. Insert these exact details into the matching sections (Parties, Amount, Interest Rate, Repayment Term, Scope of Work).
2. The substance of the draft comes from the transcript and nowhere else.
3. Use placeholders such as [Party A Name], [Date], [Address], [State/Jurisdiction] ONLY for standard information the transcript does not contain. NEVER use a placeholder for a name, amount, or key term the transcript mentions.
4. Structure: Parties, Background/Recitals (if the context supports it), Core Agreement, Payment Terms, Term/Duration, Default, Confidentiality (if applicable), Warranties/Disclaimers (scaled to trust), Dispute Resolution (scaled to trust), Governing Law, Signatures.
5. Clear, concise, professional language with minimal jargon. This is a first draft for review, not a document ready for signature.

Conversation Transcript:
{conversation_text}

Assessed Trust Level:
{trust_level}"#;

pub fn render_questions_prompt(transcript: &str) -> String {
    fill_template(
        TRUST_QUESTIONS_TEMPLATE,
        &[("conversation_text", transcript)],
    )
}

pub fn render_summary_prompt(questions_and_answers: &str) -> String {
    fill_template(
        TRUST_SUMMARY_TEMPLATE,
        &[("questions_and_answers", questions_and_answers)],
    )
}

pub fn render_drafting_prompt(transcript: &str, trust_level: TrustLevel) -> String {
    fill_template(
        DRAFTING_TEMPLATE,
        &[
            ("conversation_text", transcript),
            ("trust_level", trust_level.as_str()),
        ],
    )
}
