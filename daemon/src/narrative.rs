/// Commentary generation: personas, prompt templates and fallback text.
///
/// Narration never returns an error. When the text generator fails, a fixed
/// per-kind fallback is returned instead so the event still gets announced.
/// The only event without a message is a rank change whose `eventType` is not
/// recognised.
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::gemini::TextGenerator;
use crate::ladder::{
    LadderEvent, PlayerRank, RankChangeEvent, RankChangeType, WeeklySummaryEvent,
};

/// Fallback bulletin for a weekly summary the model could not write.
pub const WEEKLY_SUMMARY_FALLBACK: &str =
    "**Weekly Wrap-up**\nThe commentary could not be generated.";

// ── Personas ───────────────────────────────────────────────────────────────────

/// Commentary style used for LP-loss narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    CursedPoet,
    SarcasticSportsCaster,
    SnarkyAndConcise,
}

impl Persona {
    pub const ALL: [Persona; 3] = [
        Persona::CursedPoet,
        Persona::SarcasticSportsCaster,
        Persona::SnarkyAndConcise,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Persona::CursedPoet => "Cursed Poet",
            Persona::SarcasticSportsCaster => "Sarcastic Sports Caster",
            Persona::SnarkyAndConcise => "Snarky and Concise",
        }
    }

    /// Picks one persona uniformly at random.
    pub fn choose<R: Rng + ?Sized>(rng: &mut R) -> Persona {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// Role instruction for this persona.
    fn task(self, player: &str, lp_lost: &str) -> String {
        match self {
            Persona::CursedPoet => format!(
                "You are a Cursed Poet. The player \"{player}\" just lost {lp_lost} LP. \
                 Write a short rhyming quatrain (ABAB or AABB) celebrating their glorious defeat."
            ),
            Persona::SarcasticSportsCaster => format!(
                "You are a Sarcastic Sports Caster. \"{player}\" just lost {lp_lost} LP. \
                 Describe this performance in a medium-length comment full of exaggerated \
                 sports metaphors."
            ),
            Persona::SnarkyAndConcise => format!(
                "You are a cynical bot. \"{player}\" just lost {lp_lost} LP. \
                 Dismiss them with a very short, sharp one-liner (max 10 words)."
            ),
        }
    }
}

// ── Prompt templates ───────────────────────────────────────────────────────────

pub fn lp_loss_prompt(persona: Persona, player: &str, lp_lost: &str) -> String {
    format!(
        "Your persona: {}. Your task: {} Respond in English. \
         Do not include the LP number in your response.",
        persona.name(),
        persona.task(player, lp_lost)
    )
}

fn describe(player: &PlayerRank) -> String {
    format!("{} ({} {})", player.tag, player.tier, player.rank)
}

pub fn overtake_prompt(winner: &PlayerRank, loser: &PlayerRank) -> String {
    format!(
        "BREAKING NEWS: a leaderboard overtake just happened! \"{w}\" has climbed past \"{l}\". \
         You are an over-the-top, excited sports announcer. Write a SHORT and EPIC comment \
         (1-2 sentences) about this moment. Winner: {wd}. Overtaken: {ld}. Respond in English.",
        w = winner.tag,
        l = loser.tag,
        wd = describe(winner),
        ld = describe(loser),
    )
}

pub fn undertake_prompt(winner: &PlayerRank, loser: &PlayerRank) -> String {
    format!(
        "DRAMA ON THE LADDER: after a catastrophic fall, \"{l}\" has dropped below \"{w}\". \
         You are a cynical announcer. Write a SHORT and SNARKY comment (1-2 sentences) about \
         the fallen player's disastrous performance. Now ranked higher: {wd}. \
         The one who fell: {ld}. Respond in English.",
        w = winner.tag,
        l = loser.tag,
        wd = describe(winner),
        ld = describe(loser),
    )
}

pub fn weekly_summary_prompt(data: &serde_json::Value) -> String {
    let payload = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
    format!(
        "You are a sports journalist writing the \"Weekly Wrap-up\" segment for a League of \
         Legends ranked ladder. Keep it CONCISE: group players where it helps instead of writing \
         a paragraph per player, with an epic but compact tone. Weekly data:\n{payload}\n\
         Write a bulletin that starts with a headline and covers the main movements, who climbed \
         the most, who fell the hardest, and any notable rivalries. Respond in English."
    )
}

// ── Fallbacks ──────────────────────────────────────────────────────────────────

pub fn lp_loss_fallback(player: &str) -> String {
    format!("{player} lost LP. The AI is on strike.")
}

pub fn rank_change_fallback(event: &RankChangeEvent) -> String {
    match event.event_type {
        RankChangeType::Overtake => format!(
            "Incredible! {} has overtaken {}!",
            event.winner.tag, event.loser.tag
        ),
        RankChangeType::Undertake => format!(
            "Unbelievable! {} dropped so hard they're now below {}!",
            event.loser.tag, event.winner.tag
        ),
        RankChangeType::Unknown => format!(
            "{} and {} just swapped places on the ladder.",
            event.winner.tag, event.loser.tag
        ),
    }
}

/// Final chat text for an LP loss: the phrase followed by the amount in bold.
pub fn lp_loss_message(phrase: &str, lp_lost: &str) -> String {
    format!("{phrase} -*{lp_lost} LP*")
}

// ── Narrator ───────────────────────────────────────────────────────────────────

/// Turns parsed events into chat-ready text.
pub struct Narrator {
    generator: Arc<dyn TextGenerator>,
    rng: Mutex<StdRng>,
}

impl Narrator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self::with_rng(generator, StdRng::from_entropy())
    }

    /// Uses a caller-supplied RNG, e.g. `StdRng::seed_from_u64` for
    /// deterministic persona selection.
    pub fn with_rng(generator: Arc<dyn TextGenerator>, rng: StdRng) -> Self {
        Self {
            generator,
            rng: Mutex::new(rng),
        }
    }

    /// Produces the complete outbound message for `event`, or `None` when the
    /// event should not be announced at all.
    pub async fn narrate(&self, event: &LadderEvent) -> Option<String> {
        match event {
            LadderEvent::LpLoss(e) => {
                let phrase = self.lp_loss_phrase(&e.player.display(), &e.lp_lost).await;
                Some(lp_loss_message(&phrase, &e.lp_lost))
            }
            LadderEvent::RankChange(e) => self.rank_change(e).await,
            LadderEvent::WeeklySummary(e) => Some(self.weekly_summary(e).await),
        }
    }

    /// Persona commentary for an LP loss, without the amount suffix.
    pub async fn lp_loss_phrase(&self, player: &str, lp_lost: &str) -> String {
        let persona = self.pick_persona();
        info!(player = %player, persona = persona.name(), "generating LP loss commentary");
        let prompt = lp_loss_prompt(persona, player, lp_lost);
        self.generate_or(&prompt, "lp_loss", || lp_loss_fallback(player))
            .await
    }

    /// `None` for an unrecognised `eventType`; the generator is not called.
    pub async fn rank_change(&self, event: &RankChangeEvent) -> Option<String> {
        let (winner, loser) = (&event.winner, &event.loser);
        let (prompt, label) = match event.event_type {
            RankChangeType::Overtake => (overtake_prompt(winner, loser), "overtake"),
            RankChangeType::Undertake => (undertake_prompt(winner, loser), "undertake"),
            RankChangeType::Unknown => return None,
        };
        let text = self
            .generate_or(&prompt, label, || rank_change_fallback(event))
            .await;
        Some(text)
    }

    pub async fn weekly_summary(&self, event: &WeeklySummaryEvent) -> String {
        let prompt = weekly_summary_prompt(&event.data);
        self.generate_or(&prompt, "weekly_summary", || WEEKLY_SUMMARY_FALLBACK.to_string())
            .await
    }

    fn pick_persona(&self) -> Persona {
        // A poisoned lock still holds a usable RNG.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        Persona::choose(&mut *rng)
    }

    async fn generate_or(
        &self,
        prompt: &str,
        label: &str,
        fallback: impl FnOnce() -> String,
    ) -> String {
        match self.generator.generate(prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!(kind = label, "text generator returned an empty response; using fallback");
                fallback()
            }
            Err(e) => {
                warn!(kind = label, error = %e, "text generation failed; using fallback");
                fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::GenerationError;
    use crate::ladder::{LpLossEvent, PlayerName};
    use async_trait::async_trait;

    /// Records prompts and answers with a fixed reply, or fails.
    struct FakeGenerator {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeGenerator {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .ok_or_else(|| GenerationError::RequestFailed("offline".to_string()))
        }
    }

    fn rank(tag: &str, tier: &str, rank: &str) -> PlayerRank {
        PlayerRank {
            tag: tag.to_string(),
            tier: tier.to_string(),
            rank: rank.to_string(),
        }
    }

    fn rank_change(event_type: RankChangeType) -> RankChangeEvent {
        RankChangeEvent {
            event_type,
            winner: rank("A", "GOLD", "II"),
            loser: rank("B", "GOLD", "III"),
        }
    }

    // ── personas ──────────────────────────────────────────────────────────────

    #[test]
    fn persona_choice_is_deterministic_for_a_seed() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let left: Vec<_> = (0..20).map(|_| Persona::choose(&mut a)).collect();
        let right: Vec<_> = (0..20).map(|_| Persona::choose(&mut b)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn persona_choice_covers_every_persona() {
        let mut rng = StdRng::seed_from_u64(42);
        let picked: Vec<_> = (0..300).map(|_| Persona::choose(&mut rng)).collect();
        for persona in Persona::ALL {
            assert!(picked.contains(&persona), "{} never chosen", persona.name());
        }
    }

    // ── prompts ───────────────────────────────────────────────────────────────

    #[test]
    fn lp_loss_prompt_names_persona_player_and_amount() {
        let prompt = lp_loss_prompt(Persona::CursedPoet, "Player One", "23");
        assert!(prompt.contains("Cursed Poet"));
        assert!(prompt.contains("\"Player One\""));
        assert!(prompt.contains("23 LP"));
        assert!(prompt.contains("Respond in English"));
        assert!(prompt.contains("Do not include the LP number"));
    }

    #[test]
    fn rank_change_prompts_name_both_players() {
        let e = rank_change(RankChangeType::Overtake);
        for prompt in [
            overtake_prompt(&e.winner, &e.loser),
            undertake_prompt(&e.winner, &e.loser),
        ] {
            assert!(prompt.contains("A (GOLD II)"));
            assert!(prompt.contains("B (GOLD III)"));
        }
    }

    #[test]
    fn weekly_summary_prompt_embeds_payload() {
        let data = serde_json::json!({"climbers": [{"tag": "Zed Main", "delta": 140}]});
        let prompt = weekly_summary_prompt(&data);
        assert!(prompt.contains("Zed Main"));
        assert!(prompt.contains("140"));
        assert!(prompt.contains("headline"));
    }

    // ── fallbacks ─────────────────────────────────────────────────────────────

    #[test]
    fn rank_change_fallbacks_contain_both_tags() {
        for t in [RankChangeType::Overtake, RankChangeType::Undertake] {
            let text = rank_change_fallback(&rank_change(t));
            assert!(text.contains('A') && text.contains('B'), "{text}");
        }
    }

    #[test]
    fn lp_loss_message_format() {
        assert_eq!(lp_loss_message("Ouch.", "23"), "Ouch. -*23 LP*");
    }

    // ── Narrator ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn narrate_lp_loss_trims_reply_and_appends_amount() {
        let generator = FakeGenerator::replying("  Down they go.\n");
        let narrator = Narrator::with_rng(generator.clone(), StdRng::seed_from_u64(1));
        let event = LadderEvent::LpLoss(LpLossEvent {
            player: PlayerName::new("Player_One"),
            lp_lost: "23".to_string(),
        });

        let text = narrator.narrate(&event).await;

        assert_eq!(text.as_deref(), Some("Down they go. -*23 LP*"));
        assert!(generator.last_prompt().contains("\"Player One\""));
    }

    #[tokio::test]
    async fn narrate_lp_loss_falls_back_on_error() {
        let narrator = Narrator::with_rng(FakeGenerator::failing(), StdRng::seed_from_u64(1));
        let event = LadderEvent::LpLoss(LpLossEvent {
            player: PlayerName::new("player1"),
            lp_lost: "23".to_string(),
        });

        assert_eq!(
            narrator.narrate(&event).await.as_deref(),
            Some("player1 lost LP. The AI is on strike. -*23 LP*")
        );
    }

    #[tokio::test]
    async fn empty_reply_uses_fallback() {
        let narrator = Narrator::new(FakeGenerator::replying("   "));
        let text = narrator.rank_change(&rank_change(RankChangeType::Overtake)).await;
        assert_eq!(text.as_deref(), Some("Incredible! A has overtaken B!"));
    }

    #[tokio::test]
    async fn undertake_uses_undertake_template() {
        let generator = FakeGenerator::replying("Oof.");
        let narrator = Narrator::new(generator.clone());
        let text = narrator.rank_change(&rank_change(RankChangeType::Undertake)).await;
        assert_eq!(text.as_deref(), Some("Oof."));
        assert!(generator.last_prompt().starts_with("DRAMA ON THE LADDER"));
    }

    #[tokio::test]
    async fn unknown_rank_change_is_not_narrated() {
        let generator = FakeGenerator::replying("Should not be used.");
        let narrator = Narrator::new(generator.clone());
        let event = LadderEvent::RankChange(rank_change(RankChangeType::Unknown));

        assert_eq!(narrator.narrate(&event).await, None);
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn weekly_summary_falls_back_on_error() {
        let narrator = Narrator::new(FakeGenerator::failing());
        let event = WeeklySummaryEvent {
            data: serde_json::json!({}),
        };
        assert_eq!(narrator.weekly_summary(&event).await, WEEKLY_SUMMARY_FALLBACK);
    }
}
