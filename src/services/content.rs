use serde::Serialize;

use crate::services::profile::LearningStyle;
use crate::store::Concept;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedContent {
    pub concept_id: String,
    pub learning_style: LearningStyle,
    pub explanation: String,
    pub study_tips: Vec<&'static str>,
    pub practice_type: &'static str,
}

struct StyleTemplate {
    icon: &'static str,
    pitch: &'static str,
    tips: [&'static str; 4],
    practice_type: &'static str,
}

fn template(style: LearningStyle) -> StyleTemplate {
    match style {
        LearningStyle::Visual => StyleTemplate {
            icon: "🎯",
            pitch: "Visual learners excel with diagrams and charts. This {difficulty} concept builds on your visual processing strengths.",
            tips: [
                "Create mind maps and flowcharts",
                "Use color-coded notes",
                "Draw concept relationships",
                "Watch video demonstrations",
            ],
            practice_type: "interactive_visualization",
        },
        LearningStyle::Auditory => StyleTemplate {
            icon: "🎵",
            pitch: "As an auditory learner, you'll master this {difficulty} concept through discussion and verbal explanation.",
            tips: [
                "Read concepts aloud",
                "Join study groups",
                "Use mnemonic devices",
                "Listen to explanatory podcasts",
            ],
            practice_type: "verbal_explanation",
        },
        LearningStyle::Kinesthetic => StyleTemplate {
            icon: "🤲",
            pitch: "Hands-on practice will help you master this {difficulty} concept through active engagement.",
            tips: [
                "Work through practice problems",
                "Use physical manipulatives",
                "Take frequent breaks",
                "Apply concepts to real scenarios",
            ],
            practice_type: "hands_on_practice",
        },
        LearningStyle::Reading => StyleTemplate {
            icon: "📚",
            pitch: "Deep reading and written analysis will help you excel with this {difficulty} concept.",
            tips: [
                "Take detailed written notes",
                "Summarize key points",
                "Create written explanations",
                "Use textbook resources",
            ],
            practice_type: "written_analysis",
        },
    }
}

pub fn personalized_content(concept: &Concept, style: LearningStyle) -> PersonalizedContent {
    let template = template(style);
    let difficulty = concept.difficulty.as_str().to_lowercase();
    let pitch = template.pitch.replace("{difficulty}", &difficulty);

    PersonalizedContent {
        concept_id: concept.id.clone(),
        learning_style: style,
        explanation: format!("{} {}: {}", template.icon, concept.name, pitch),
        study_tips: template.tips.to_vec(),
        practice_type: template.practice_type,
    }
}
