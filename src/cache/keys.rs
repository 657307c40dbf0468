pub fn learner_profile_key(learner_id: &str) -> String {
    format!("learner:{}:profile", learner_id)
}
