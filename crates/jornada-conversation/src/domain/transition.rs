//! The transition function: `(step, answers, event) -> (step, answers, effects)`.
//!
//! Pure. Content comes from the [`Script`]; side effects are returned as
//! [`Effect`]s for the driver to perform in order.

use super::effects::Effect;
use super::events::ConversationEvent;
use super::keywords::{self, OfferReply};
use super::messages::MessageDraft;
use super::script::{Beat, GeneratedBeat, Script};
use super::session::Answers;
use super::steps::Step;

/// The decision for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Step to commit once every effect has been performed.
    pub next: Step,
    /// Answers to commit alongside `next`.
    pub answers: Answers,
    /// Effects to perform, in order.
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(step: Step, answers: &Answers) -> Self {
        Self {
            next: step,
            answers: answers.clone(),
            effects: Vec::new(),
        }
    }

    fn to(mut self, next: Step) -> Self {
        self.next = next;
        self
    }

    fn effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn pause(self, beat_pause: std::time::Duration) -> Self {
        if beat_pause.is_zero() {
            self
        } else {
            self.effect(Effect::Pause(beat_pause))
        }
    }

    /// Withdraws stale quick replies and shows the user's bubble.
    fn echo(self, text: &str) -> Self {
        self.effect(Effect::ClearOptions)
            .effect(Effect::Emit(MessageDraft::user_text(text)))
    }

    /// Plays a scripted batch, rendered against the answers committed so far.
    fn play(mut self, beats: &[Beat], input: Option<&str>) -> Self {
        for beat in beats {
            let draft = beat.render(&self.answers, input);
            self = self.pause(beat.pause()).effect(Effect::Emit(draft));
        }
        self
    }

    fn generate(self, beat: &GeneratedBeat, input: Option<&str>) -> Self {
        let prompt = beat.prompt(&self.answers, input);
        self.pause(beat.pause()).effect(Effect::Generate { prompt })
    }

    /// Returns `true` if this transition asks for no side effects.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Decides what `event` does at `step`.
#[must_use]
pub fn transition(
    step: Step,
    answers: &Answers,
    event: &ConversationEvent,
    script: &Script,
) -> Transition {
    let stay = Transition::stay(step, answers);
    match (step, event) {
        (Step::Welcome, ConversationEvent::Start) => {
            stay.play(&script.greeting, None).to(Step::AwaitingName)
        }
        (_, ConversationEvent::UserText(text)) => on_user_text(stay, text, script),
        (
            Step::AwaitingMotivation,
            ConversationEvent::NameCorrectionChecked { input, correction },
        ) => match correction.corrected_name() {
            Some(name) => {
                let mut corrected = stay;
                corrected.answers.name = Some(name.to_owned());
                corrected
                    .play(&script.name_correction_ack, None)
                    .play(&script.motivation_reask, None)
            }
            None => {
                let mut captured = stay;
                captured.answers.motivation = Some(input.clone());
                captured
                    .generate(&script.motivation_empathy, Some(input))
                    .play(&script.motivation_followup, Some(input))
                    .to(Step::AwaitingDuration)
            }
        },
        (Step::StatusGate, ConversationEvent::StoriesDismissed) => stay
            .play(&script.stories_viewed, None)
            .to(Step::AwaitingStoryReaction),
        (Step::OnCall, ConversationEvent::CallFinished) => stay
            .effect(Effect::DismissLiveCall)
            .play(&script.call_followup, None)
            .to(Step::AwaitingOffer),
        _ => stay,
    }
}

fn on_user_text(stay: Transition, text: &str, script: &Script) -> Transition {
    let step = stay.next;
    if step == Step::Welcome {
        return stay;
    }
    let mut t = stay.echo(text);
    let input = Some(text);
    match step {
        Step::AwaitingName => {
            if keywords::is_filler(text, &script.keywords) {
                t.play(&script.name_filler, input)
            } else {
                t.answers.name = Some(text.trim().to_owned());
                t.play(&script.name_captured, input)
                    .to(Step::AwaitingMotivation)
            }
        }
        Step::AwaitingMotivation => {
            let previous_name = t.answers.name.clone().unwrap_or_default();
            t.effect(Effect::CheckNameCorrection {
                previous_name,
                input: text.to_owned(),
            })
        }
        Step::AwaitingDuration => {
            t.answers.pain_duration = Some(text.to_owned());
            t.play(&script.duration_captured, input)
                .to(Step::AwaitingAttempts)
        }
        Step::AwaitingAttempts => {
            t.answers.attempts = Some(text.to_owned());
            t.generate(&script.attempts_empathy, input)
                .play(&script.attempts_followup, input)
                .to(Step::AwaitingConnection)
        }
        Step::AwaitingConnection => {
            t.answers.connection = Some(text.to_owned());
            t.play(&script.connection_captured, input)
                .to(Step::StatusGate)
        }
        Step::StatusGate => {
            if keywords::is_stories_open(text, &script.keywords) {
                t.effect(Effect::OpenStories)
            } else {
                t
            }
        }
        Step::AwaitingStoryReaction => t
            .play(&script.call_intro, input)
            .effect(Effect::StartCallTimer(script.call_duration()))
            .to(Step::OnCall),
        Step::Welcome | Step::OnCall => t,
        Step::AwaitingOffer => match keywords::classify_offer_reply(text, &script.keywords) {
            OfferReply::Affirmative => t
                .play(&script.offer_accepted, input)
                .to(Step::AwaitingContact),
            OfferReply::Question => t.play(&script.offer_explained, input),
            OfferReply::Other => t.play(&script.offer_reprompt, input),
        },
        Step::AwaitingContact => {
            t.answers.contact = Some(text.trim().to_owned());
            t.play(&script.contact_captured, input).to(Step::FreeChat)
        }
        Step::FreeChat => t.generate(&script.free_chat, input),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use jornada_core::generation::NameCorrection;

    use super::*;
    use crate::domain::messages::{MessageKind, Sender};

    fn script() -> Script {
        Script::builtin().unwrap()
    }

    fn named(name: &str) -> Answers {
        Answers {
            name: Some(name.to_owned()),
            ..Answers::default()
        }
    }

    fn text(input: &str) -> ConversationEvent {
        ConversationEvent::UserText(input.to_owned())
    }

    fn emitted(t: &Transition) -> Vec<&MessageDraft> {
        t.effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Emit(draft) => Some(draft),
                _ => None,
            })
            .collect()
    }

    fn bot_contents(t: &Transition) -> Vec<&str> {
        emitted(t)
            .into_iter()
            .filter(|draft| draft.sender == Sender::Bot)
            .map(|draft| draft.content.as_str())
            .collect()
    }

    #[test]
    fn test_start_plays_greeting_and_waits_for_name() {
        // Act
        let t = transition(
            Step::Welcome,
            &Answers::default(),
            &ConversationEvent::Start,
            &script(),
        );

        // Assert
        assert_eq!(t.next, Step::AwaitingName);
        let drafts = emitted(&t);
        assert_eq!(drafts[0].sender, Sender::User);
        assert_eq!(drafts[1].kind, MessageKind::Audio);
        assert_eq!(t.effects[1], Effect::Pause(Duration::from_millis(3000)));
    }

    #[test]
    fn test_start_after_welcome_is_noop() {
        let t = transition(
            Step::AwaitingName,
            &Answers::default(),
            &ConversationEvent::Start,
            &script(),
        );

        assert!(t.is_noop());
        assert_eq!(t.next, Step::AwaitingName);
    }

    #[test]
    fn test_text_before_start_is_ignored() {
        let t = transition(Step::Welcome, &Answers::default(), &text("oi"), &script());

        assert!(t.is_noop());
    }

    #[test]
    fn test_user_text_is_echoed_after_clearing_options() {
        let t = transition(Step::AwaitingName, &Answers::default(), &text("Ana"), &script());

        assert_eq!(t.effects[0], Effect::ClearOptions);
        assert_eq!(t.effects[1], Effect::Emit(MessageDraft::user_text("Ana")));
    }

    #[test]
    fn test_filler_reply_re_asks_name_without_advancing() {
        // Act
        let t = transition(
            Step::AwaitingName,
            &Answers::default(),
            &text("Tudo bem, e você?"),
            &script(),
        );

        // Assert
        assert_eq!(t.next, Step::AwaitingName);
        assert_eq!(t.answers.name, None);
        assert_eq!(
            bot_contents(&t),
            [
                "Que ótimo! Fico feliz em saber. 😊",
                "E para a gente se conhecer melhor, como posso te chamar?"
            ]
        );
    }

    #[test]
    fn test_name_is_captured_trimmed() {
        // Act
        let t = transition(Step::AwaitingName, &Answers::default(), &text("  Ana  "), &script());

        // Assert
        assert_eq!(t.next, Step::AwaitingMotivation);
        assert_eq!(t.answers.name.as_deref(), Some("Ana"));
        assert!(bot_contents(&t)[0].starts_with("É um prazer te conhecer, Ana!"));
    }

    #[test]
    fn test_name_that_looks_like_placeholder_is_shown_verbatim() {
        // Act
        let t = transition(
            Step::AwaitingName,
            &Answers::default(),
            &text("{contact}"),
            &script(),
        );

        // Assert
        assert_eq!(t.answers.name.as_deref(), Some("{contact}"));
        assert!(bot_contents(&t)[0].starts_with("É um prazer te conhecer, {contact}!"));
    }

    #[test]
    fn test_motivation_first_asks_classifier() {
        // Act
        let t = transition(Step::AwaitingMotivation, &named("Ana"), &text("quero paz"), &script());

        // Assert
        assert_eq!(t.next, Step::AwaitingMotivation);
        assert_eq!(
            t.effects.last(),
            Some(&Effect::CheckNameCorrection {
                previous_name: "Ana".to_owned(),
                input: "quero paz".to_owned(),
            })
        );
        assert_eq!(t.answers.motivation, None);
    }

    #[test]
    fn test_name_correction_overwrites_name_and_re_asks() {
        // Arrange
        let event = ConversationEvent::NameCorrectionChecked {
            input: "na verdade é Bia".to_owned(),
            correction: NameCorrection::to("Bia"),
        };

        // Act
        let t = transition(Step::AwaitingMotivation, &named("Ana"), &event, &script());

        // Assert
        assert_eq!(t.next, Step::AwaitingMotivation);
        assert_eq!(t.answers.name.as_deref(), Some("Bia"));
        assert_eq!(t.answers.motivation, None);
        assert_eq!(
            bot_contents(&t),
            [
                "Ops, anotado! Vou te chamar de Bia então. 😉",
                "Certo, Bia! E qual seria a sua maior motivação para buscar a cura espiritual?"
            ]
        );
    }

    #[test]
    fn test_repeated_name_correction_re_asks_identically() {
        let event = ConversationEvent::NameCorrectionChecked {
            input: "me chama de Bia".to_owned(),
            correction: NameCorrection::to("Bia"),
        };

        let first = transition(Step::AwaitingMotivation, &named("Ana"), &event, &script());
        let second = transition(Step::AwaitingMotivation, &first.answers, &event, &script());

        assert_eq!(first.effects, second.effects);
        assert_eq!(second.answers, first.answers);
    }

    #[test]
    fn test_no_correction_captures_motivation_and_generates() {
        // Arrange
        let event = ConversationEvent::NameCorrectionChecked {
            input: "quero paz".to_owned(),
            correction: NameCorrection::none(),
        };

        // Act
        let t = transition(Step::AwaitingMotivation, &named("Ana"), &event, &script());

        // Assert
        assert_eq!(t.next, Step::AwaitingDuration);
        assert_eq!(t.answers.motivation.as_deref(), Some("quero paz"));
        let prompt = t
            .effects
            .iter()
            .find_map(|effect| match effect {
                Effect::Generate { prompt } => Some(prompt.as_str()),
                _ => None,
            })
            .unwrap();
        assert!(prompt.starts_with("O usuário Ana tem a seguinte motivação: \"quero paz\"."));
    }

    #[test]
    fn test_attempts_generate_before_follow_up_question() {
        let t = transition(Step::AwaitingAttempts, &named("Ana"), &text("terapia"), &script());

        assert_eq!(t.next, Step::AwaitingConnection);
        let generate_at = t
            .effects
            .iter()
            .position(|effect| matches!(effect, Effect::Generate { .. }))
            .unwrap();
        let last_emit_at = t
            .effects
            .iter()
            .rposition(|effect| matches!(effect, Effect::Emit(_)))
            .unwrap();
        assert!(generate_at < last_emit_at);
        assert_eq!(t.answers.attempts.as_deref(), Some("terapia"));
    }

    #[test]
    fn test_connection_shows_status_teaser() {
        let t = transition(Step::AwaitingConnection, &named("Ana"), &text("no verão"), &script());

        assert_eq!(t.next, Step::StatusGate);
        let teaser = emitted(&t).into_iter().last().unwrap();
        assert_eq!(teaser.kind, MessageKind::Status);
        assert_eq!(teaser.options, Some(vec!["Ver status".to_owned()]));
    }

    #[test]
    fn test_status_gate_opens_stories_without_advancing() {
        let t = transition(Step::StatusGate, &named("Ana"), &text("Ver status"), &script());

        assert_eq!(t.next, Step::StatusGate);
        assert_eq!(t.effects.last(), Some(&Effect::OpenStories));
        assert!(bot_contents(&t).is_empty());
    }

    #[test]
    fn test_status_gate_ignores_other_text() {
        let t = transition(Step::StatusGate, &named("Ana"), &text("oi?"), &script());

        assert_eq!(t.next, Step::StatusGate);
        assert!(bot_contents(&t).is_empty());
        assert!(!t.effects.contains(&Effect::OpenStories));
    }

    #[test]
    fn test_stories_dismissed_advances_past_gate() {
        let t = transition(
            Step::StatusGate,
            &named("Ana"),
            &ConversationEvent::StoriesDismissed,
            &script(),
        );

        assert_eq!(t.next, Step::AwaitingStoryReaction);
        assert_eq!(bot_contents(&t).len(), 2);
    }

    #[test]
    fn test_stories_dismissed_elsewhere_is_noop() {
        let t = transition(
            Step::AwaitingOffer,
            &named("Ana"),
            &ConversationEvent::StoriesDismissed,
            &script(),
        );

        assert!(t.is_noop());
    }

    #[test]
    fn test_story_reaction_starts_call() {
        // Act
        let t = transition(Step::AwaitingStoryReaction, &named("Ana"), &text("amei"), &script());

        // Assert
        assert_eq!(t.next, Step::OnCall);
        assert_eq!(
            t.effects.last(),
            Some(&Effect::StartCallTimer(Duration::from_secs(15)))
        );
        assert_eq!(emitted(&t).last().unwrap().kind, MessageKind::LiveCall);
    }

    #[test]
    fn test_text_during_call_never_advances() {
        let t = transition(Step::OnCall, &named("Ana"), &text("alô?"), &script());

        assert_eq!(t.next, Step::OnCall);
        assert!(bot_contents(&t).is_empty());
        assert!(!t
            .effects
            .iter()
            .any(|effect| matches!(effect, Effect::StartCallTimer(_))));
    }

    #[test]
    fn test_call_finished_dismisses_call_and_offers() {
        // Act
        let t = transition(
            Step::OnCall,
            &named("Ana"),
            &ConversationEvent::CallFinished,
            &script(),
        );

        // Assert
        assert_eq!(t.next, Step::AwaitingOffer);
        assert_eq!(t.effects[0], Effect::DismissLiveCall);
        let last = emitted(&t).into_iter().last().unwrap();
        assert_eq!(last.content, "Topa seguir nessa base de confiança mútua?");
        assert_eq!(last.options.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_call_finished_after_call_is_noop() {
        let t = transition(
            Step::AwaitingOffer,
            &named("Ana"),
            &ConversationEvent::CallFinished,
            &script(),
        );

        assert!(t.is_noop());
        assert_eq!(t.next, Step::AwaitingOffer);
    }

    #[test]
    fn test_affirmative_offer_reveals_payment() {
        // Act
        let t = transition(Step::AwaitingOffer, &named("Ana"), &text("Sim, eu topo!"), &script());

        // Assert
        assert_eq!(t.next, Step::AwaitingContact);
        let contents = bot_contents(&t);
        assert!(contents.contains(&"Chave PIX (E-mail): contato@curaespritual.com"));
        assert!(contents[0].starts_with("Maravilha, Ana!"));
    }

    #[test]
    fn test_payment_question_explains_and_stays() {
        // Act
        let t = transition(
            Step::AwaitingOffer,
            &named("Ana"),
            &text("Como funciona o pagamento?"),
            &script(),
        );

        // Assert
        assert_eq!(t.next, Step::AwaitingOffer);
        let contents = bot_contents(&t);
        assert!(contents[0].starts_with("Funciona na base da confiança!"));
        assert_eq!(
            emitted(&t).last().unwrap().options,
            Some(vec!["Com certeza! Eu topo!".to_owned()])
        );
    }

    #[test]
    fn test_other_offer_reply_re_prompts() {
        let t = transition(Step::AwaitingOffer, &named("Ana"), &text("hmm"), &script());

        assert_eq!(t.next, Step::AwaitingOffer);
        assert_eq!(
            bot_contents(&t),
            ["Topa seguir nessa base de confiança mútua?"]
        );
    }

    #[test]
    fn test_contact_is_captured_and_confirmed() {
        let t = transition(
            Step::AwaitingContact,
            &named("Ana"),
            &text(" ana@exemplo.com "),
            &script(),
        );

        assert_eq!(t.next, Step::FreeChat);
        assert_eq!(t.answers.contact.as_deref(), Some("ana@exemplo.com"));
        assert!(bot_contents(&t)[0].contains("ana@exemplo.com"));
    }

    #[test]
    fn test_free_chat_delegates_raw_input() {
        let t = transition(Step::FreeChat, &named("Ana"), &text("e agora?"), &script());

        assert_eq!(t.next, Step::FreeChat);
        assert!(t.effects.contains(&Effect::Generate {
            prompt: "e agora?".to_owned()
        }));
    }

    #[test]
    fn test_zero_pause_beats_skip_pause_effect() {
        let t = transition(Step::AwaitingOffer, &named("Ana"), &text("topo"), &script());

        // The two PIX bubbles are back to back.
        let pix_at = t
            .effects
            .iter()
            .position(|effect| {
                matches!(effect, Effect::Emit(draft) if draft.content.starts_with("Chave PIX"))
            })
            .unwrap();
        assert!(matches!(t.effects[pix_at + 1], Effect::Emit(_)));
    }

    #[test]
    fn test_step_never_moves_backwards() {
        let script = script();
        let events = [
            ConversationEvent::Start,
            text("tudo bem"),
            text("Ana"),
            text("Ver status"),
            text("topo"),
            text("Como funciona o pagamento?"),
            ConversationEvent::StoriesDismissed,
            ConversationEvent::CallFinished,
            ConversationEvent::NameCorrectionChecked {
                input: "Bia".to_owned(),
                correction: NameCorrection::to("Bia"),
            },
            ConversationEvent::NameCorrectionChecked {
                input: "paz".to_owned(),
                correction: NameCorrection::none(),
            },
        ];

        for step in Step::ALL {
            for event in &events {
                let t = transition(step, &named("Ana"), event, &script);
                assert!(t.next >= step, "{event:?} moved {step} back to {}", t.next);
            }
        }
    }
}
