//! Prompt text sent to the model.

/// Prompt asking for `count` multiple-choice questions about `content`.
pub fn quiz_prompt(content: &str, count: u32) -> String {
    format!(
        "Generate a quiz with {count} questions based on the following content:\n\
         \n\
         {content}\n\
         \n\
         For each question, provide:\n\
         1. The question text\n\
         2. Four multiple-choice options (A, B, C, D), each starting with its letter, e.g. \"A) ...\"\n\
         3. The correct answer (A, B, C, or D)\n\
         \n\
         The answer should follow the response schema.\n"
    )
}

/// Prompt asking for a simplified explanation of what the user got wrong.
pub fn remediation_prompt(content: &str, incorrect_questions: &[String]) -> String {
    format!(
        "Based on the following content and the questions the user answered incorrectly, \
         provide a simplified explanation of the key concepts related to these questions:\n\
         \n\
         Content: {content}\n\
         \n\
         Incorrect questions:\n\
         {questions}\n\
         \n\
         Please provide a concise, easy-to-understand explanation of the relevant concepts.\n",
        questions = incorrect_questions.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiz_prompt_names_count_and_embeds_content() {
        let prompt = quiz_prompt("The sky is blue.", 3);
        assert!(prompt.starts_with("Generate a quiz with 3 questions"));
        assert!(prompt.contains("The sky is blue."));
        assert!(prompt.contains("(A, B, C, or D)"));
    }

    #[test]
    fn test_remediation_prompt_lists_questions_one_per_line() {
        let prompt = remediation_prompt(
            "Water boils at 100 C.",
            &["At what temperature does water boil?".to_string(), "Why?".to_string()],
        );
        assert!(prompt.contains("Content: Water boils at 100 C."));
        assert!(prompt.contains("At what temperature does water boil?\nWhy?"));
    }
}
