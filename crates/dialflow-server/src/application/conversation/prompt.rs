//! Prompt assembly for reply generation
//!
//! Builds the system context the language model is seeded with: who the
//! agent is, what the current stage calls for, what is known about the lead
//! and what has been qualified so far.

use dialflow::{CallRequest, ConversationStage, ConversationState, QualificationStage};

use crate::config::ConversationConfig;

pub fn system_context(
    config: &ConversationConfig,
    request: &CallRequest,
    state: &ConversationState,
) -> String {
    let mut prompt = format!(
        "You are {agent}, a friendly sales representative from {company} on a phone call.\n\
         You {offering}.\n\
         Speak naturally in short sentences (one or two at most); this text is read aloud.\n\
         Mirror the caller's language: reply in Hinglish if they use Hinglish.\n\
         Never invent prices or promises.\n",
        agent = config.agent_name,
        company = config.company_name,
        offering = config.offering,
    );

    prompt.push_str(&format!(
        "\n## Current Stage: {}\n{}\n",
        state.stage,
        stage_guidance(state.stage, state.qualification.stage)
    ));

    let lead = &request.lead;
    let mut lead_lines = Vec::new();
    if let Some(name) = &lead.contact_name {
        lead_lines.push(format!("- Contact: {}", name));
    }
    if let Some(company) = &lead.company {
        lead_lines.push(format!("- Business: {}", company));
    }
    if let Some(category) = &lead.category {
        lead_lines.push(format!("- Category: {}", category));
    }
    if let Some(city) = &lead.city {
        lead_lines.push(format!("- City: {}", city));
    }
    for (key, value) in &lead.extra {
        lead_lines.push(format!("- {}: {}", key, value));
    }
    if !lead_lines.is_empty() {
        prompt.push_str("\n## Lead\n");
        prompt.push_str(&lead_lines.join("\n"));
        prompt.push('\n');
    }

    let q = &state.qualification;
    prompt.push_str("\n## Qualification So Far\n");
    prompt.push_str(&format!(
        "- Decision maker: {}\n",
        match q.is_decision_maker {
            Some(true) => "yes",
            Some(false) => "no, can reach one",
            None => "unknown",
        }
    ));
    for (label, value) in [
        ("Current provider", &q.current_provider),
        ("Pain points", &q.pain_points),
        ("Budget", &q.budget),
        ("Timeline", &q.timeline),
    ] {
        prompt.push_str(&format!(
            "- {}: {}\n",
            label,
            value.as_deref().unwrap_or("unknown")
        ));
    }

    if !state.objections.is_empty() {
        prompt.push_str("\n## Objections Raised\n");
        for objection in &state.objections {
            prompt.push_str(&format!("- {}\n", objection));
        }
    }

    prompt
}

fn stage_guidance(stage: ConversationStage, next: QualificationStage) -> String {
    match stage {
        ConversationStage::Opening | ConversationStage::Introduction => {
            "Introduce yourself and the reason for the call in one line, then ask if they have a minute."
                .to_string()
        }
        ConversationStage::Qualification => format!(
            "Ask exactly one qualifying question. Next thing to learn: {}.",
            qualification_topic(next)
        ),
        ConversationStage::ObjectionHandling => {
            "Acknowledge the concern, answer it briefly and honestly, then ask a soft follow-up."
                .to_string()
        }
        ConversationStage::AppointmentBooking => {
            "Propose a specific day and time for a short meeting and ask them to confirm."
                .to_string()
        }
        ConversationStage::CallbackScheduling => {
            "Ask when would be a good time to call back and confirm it.".to_string()
        }
        ConversationStage::Closing | ConversationStage::Ended => {
            "Summarise what was agreed, thank them and say goodbye.".to_string()
        }
    }
}

fn qualification_topic(next: QualificationStage) -> &'static str {
    match next {
        QualificationStage::NotStarted | QualificationStage::DecisionMaker => {
            "whether they make decisions for the business"
        }
        QualificationStage::Situation => "how they get customers today",
        QualificationStage::PainPoints => "what is not working for them",
        QualificationStage::Budget => "their monthly marketing budget",
        QualificationStage::Timeline => "how soon they want to start",
        QualificationStage::Complete => "whether they would like a short demo",
    }
}

/// Greeting spoken as soon as the call is answered
pub fn opening_line(config: &ConversationConfig, request: &CallRequest) -> String {
    match request.lead.display_name() {
        Some(name) => format!(
            "Namaste {}! This is {} from {}. Do you have a minute?",
            name, config.agent_name, config.company_name
        ),
        None => format!(
            "Namaste! This is {} from {}. Do you have a minute?",
            config.agent_name, config.company_name
        ),
    }
}

/// Stand-in reply when generation comes back empty
pub fn scripted_line(config: &ConversationConfig, state: &ConversationState) -> String {
    match state.stage {
        ConversationStage::Opening | ConversationStage::Introduction => format!(
            "I'm calling from {} because we {}. Would that be useful for you?",
            config.company_name, config.offering
        ),
        ConversationStage::Qualification => match state.qualification.stage {
            QualificationStage::NotStarted | QualificationStage::DecisionMaker => {
                "Are you the one who handles marketing decisions for the business?".to_string()
            }
            QualificationStage::Situation => {
                "How do new customers usually find you today?".to_string()
            }
            QualificationStage::PainPoints => {
                "What is the biggest challenge in getting new customers right now?".to_string()
            }
            QualificationStage::Budget => {
                "Roughly what do you spend on marketing each month?".to_string()
            }
            QualificationStage::Timeline => "How soon would you want to get started?".to_string(),
            QualificationStage::Complete => {
                "Shall we set up a short demo so I can show you how it works?".to_string()
            }
        },
        ConversationStage::ObjectionHandling => {
            "I understand. Many of our clients felt the same at first. Could I share how it helped them?"
                .to_string()
        }
        ConversationStage::AppointmentBooking => {
            "Would tomorrow at 11 am work for a quick fifteen minute meeting?".to_string()
        }
        ConversationStage::CallbackScheduling => {
            "No problem. When would be a good time for me to call you back?".to_string()
        }
        ConversationStage::Closing => {
            "Thank you! Is there anything else you would like to know?".to_string()
        }
        ConversationStage::Ended => config.goodbye_utterance.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialflow::LeadData;
    use uuid::Uuid;

    fn request() -> CallRequest {
        CallRequest::new(Uuid::new_v4(), Uuid::new_v4(), "+919800000030").with_lead(LeadData {
            contact_name: Some("Ramesh".to_string()),
            company: Some("Sharma Dental".to_string()),
            city: Some("Pune".to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_opening_uses_contact_name() {
        let line = opening_line(&ConversationConfig::default(), &request());
        assert!(line.starts_with("Namaste Ramesh! This is Priya"));
    }

    #[test]
    fn test_system_context_sections() {
        let request = request();
        let mut state = ConversationState::new(Uuid::new_v4(), request.lead_id);
        state.stage = ConversationStage::Qualification;
        state.qualification.set_budget("20k");
        state.objections.push("too expensive".to_string());

        let prompt = system_context(&ConversationConfig::default(), &request, &state);
        assert!(prompt.contains("## Current Stage: qualification"));
        assert!(prompt.contains("- Business: Sharma Dental"));
        assert!(prompt.contains("- Budget: 20k"));
        assert!(prompt.contains("- too expensive"));
    }

    #[test]
    fn test_scripted_line_follows_qualification_gap() {
        let mut state = ConversationState::new(Uuid::new_v4(), Uuid::new_v4());
        state.stage = ConversationStage::Qualification;
        state.qualification.set_decision_maker(true);
        let line = scripted_line(&ConversationConfig::default(), &state);
        assert!(line.contains("customers usually find you"));
    }
}
