//! Offline fallback replies
//!
//! Picked by keyword when the provider cannot be reached. The reply goes to
//! the client only and is never added to the conversation.

pub const WORKOUT_TIP: &str = "I'm having trouble reaching my coaching brain right now, \
but here's a quick tip: a solid workout starts with a 5-10 minute warm-up, then \
compound movements like squats, push-ups and rows. Focus on form before adding weight!";

pub const NUTRITION_TIP: &str = "I'm offline at the moment, but here's a nutrition tip: \
build each meal around a palm-sized portion of protein, plenty of vegetables and some \
whole grains, and keep a water bottle with you throughout the day.";

pub const MOTIVATION_TIP: &str = "I can't connect right now, but remember: progress beats \
perfection. Every workout you show up for counts, even the short ones. You've got this!";

pub const DEFAULT_TIP: &str = "Sorry, I'm having trouble connecting right now. \
Please try again in a moment.";

/// Choose the canned reply for `input`
///
/// Matching is on the lowercased input, checked in order: workout, nutrition,
/// motivation.
pub fn fallback_reply(input: &str) -> &'static str {
    let input = input.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| input.contains(w));

    if mentions(&["workout", "exercise"]) {
        WORKOUT_TIP
    } else if mentions(&["diet", "nutrition"]) {
        NUTRITION_TIP
    } else if mentions(&["motivation"]) {
        MOTIVATION_TIP
    } else {
        DEFAULT_TIP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_selection() {
        assert_eq!(fallback_reply("Give me a WORKOUT plan"), WORKOUT_TIP);
        assert_eq!(fallback_reply("best exercise for legs?"), WORKOUT_TIP);
        assert_eq!(fallback_reply("help with my Nutrition"), NUTRITION_TIP);
        assert_eq!(fallback_reply("what diet should I follow"), NUTRITION_TIP);
        assert_eq!(fallback_reply("I need motivation"), MOTIVATION_TIP);
        assert_eq!(fallback_reply("hello there"), DEFAULT_TIP);
    }

    #[test]
    fn test_workout_takes_precedence() {
        assert_eq!(fallback_reply("workout and nutrition"), WORKOUT_TIP);
        assert_eq!(fallback_reply("diet motivation"), NUTRITION_TIP);
    }
}
