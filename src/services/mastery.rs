use crate::store::ConceptInteraction;

/// Seconds of study treated as optimal exposure.
const OPTIMAL_TIME_SECS: f64 = 300.0;

/// Mastery in `[0, 100]`. No interaction on file means no mastery.
pub fn mastery_score(interaction: Option<&ConceptInteraction>) -> f64 {
    let Some(interaction) = interaction else {
        return 0.0;
    };

    let time_factor = (interaction.time_spent_secs as f64 / OPTIMAL_TIME_SECS).min(1.0);
    let accuracy = (interaction.correct_answers as f64
        / interaction.total_questions.max(1) as f64)
        .min(1.0);
    let extra_attempts = interaction.attempts.saturating_sub(1) as f64;
    let attempt_penalty = (1.0 - extra_attempts * 0.1).max(0.0);

    ((accuracy * 0.6 + time_factor * 0.2 + attempt_penalty * 0.2) * 100.0).clamp(0.0, 100.0)
}
