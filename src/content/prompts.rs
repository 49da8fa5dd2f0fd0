pub const SYSTEM_PROMPT: &str = "You are an assistant that writes the weekly DataDispatch \
newsletter for developers and tech professionals. Cover AI, developer tools and programming \
practice in a professional, concise tone. Return ONLY valid JSON with exactly two keys: \
\"subject\" (at most 60 characters) and \"html\" (email-ready HTML sections with inline CSS).";

pub fn content_prompt(current_date: &str) -> String {
    format!(
        "Generate the weekly tech newsletter for {}. Include this week's highlights, \
        new developer tools, a learning resource and quick tips for developers. \
        Return only valid JSON with 'subject' and 'html' keys. Subject max 60 characters.",
        current_date
    )
}
