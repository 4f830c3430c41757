//! Profiles shipped with the binary.

use promptline_core::{Profile, ProfileOrigin};

/// The profile active at startup and used when a request names none.
pub const DEFAULT_PROFILE_ID: &str = "JKU_ASSISTANT";

/// All built-in profiles, default first.
pub fn builtin_profiles() -> Vec<Profile> {
    vec![
        builtin(
            DEFAULT_PROFILE_ID,
            "JKU Assistant",
            "University helper for study programmes, campus services and events",
            "2.0.0",
            "You are the JKU Assistant, a friendly helper for students and staff of \
             Johannes Kepler University Linz. Answer questions about study programmes, \
             enrolment, campus services, libraries and events. Keep answers accurate and \
             concise, use Markdown for lists, and say plainly when you do not know \
             something instead of guessing. Reply in the language the question was asked in.",
        ),
        builtin(
            "LOYALTY_ADVISOR",
            "Loyalty Advisor",
            "Explains bonus points, cashback and partner offers",
            "1.1.0",
            "You are a loyalty programme advisor. Explain how customers earn and redeem \
             bonus points, how cashback is calculated, and which partner stores take part \
             in the programme. Give concrete step-by-step guidance, mention any conditions \
             or limits that apply, and suggest contacting customer support for questions \
             about a specific account balance.",
        ),
        builtin(
            "CONCISE_HELPER",
            "Concise Helper",
            "Short, plain-language answers to general questions",
            "1.0.0",
            "You are a concise general-purpose helper. Answer every question in at most \
             three short sentences, prefer plain words over jargon, and offer to expand \
             only if the question clearly needs more detail. When a request is ambiguous, \
             ask one clarifying question before answering.",
        ),
    ]
}

fn builtin(id: &str, name: &str, description: &str, version: &str, prompt: &str) -> Profile {
    Profile {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        version: version.into(),
        prompt: prompt.into(),
        origin: ProfileOrigin::BuiltIn,
    }
}
