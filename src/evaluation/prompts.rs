use crate::oracle::OracleRequest;
use crate::questions::EvaluationQuestion;

/// Heading that separates a question's instruction from the contract text
pub const CONTRACT_HEADING: &str = "Vertragstext:";

/// User message for one question: the instruction followed by the contract text
pub fn question_message(instruction: &str, contract_text: &str) -> String {
    format!("{}\n\n{}\n{}", instruction, CONTRACT_HEADING, contract_text)
}

/// Oracle request for one question against the acquired text
pub fn question_request(system_prompt: &str, question: &EvaluationQuestion, contract_text: &str) -> OracleRequest {
    OracleRequest::new(system_prompt, question_message(&question.instruction, contract_text))
}
