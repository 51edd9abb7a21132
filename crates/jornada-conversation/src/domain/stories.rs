//! Status story viewer: a linear slideshow that gates the conversation.

use std::time::Duration;

use serde::Serialize;

use super::events::ConversationEvent;
use super::script::Story;

/// Full-screen slideshow over the script's stories.
#[derive(Debug, Clone)]
pub struct StoryViewer {
    stories: Vec<Story>,
    index: usize,
    elapsed: Duration,
    per_story: Option<Duration>,
    finished: bool,
}

/// What a client needs to draw the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryView {
    pub index: usize,
    pub total: usize,
    pub story: Story,
}

impl StoryViewer {
    /// Opens the viewer on the first story. With `per_story` set, stories
    /// advance on their own; otherwise navigation is user-paced.
    #[must_use]
    pub fn open(stories: Vec<Story>, per_story: Option<Duration>) -> Self {
        Self {
            stories,
            index: 0,
            elapsed: Duration::ZERO,
            per_story,
            finished: false,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The story on screen, or `None` once the viewer is closed.
    #[must_use]
    pub fn current(&self) -> Option<&Story> {
        if self.finished {
            None
        } else {
            self.stories.get(self.index)
        }
    }

    #[must_use]
    pub fn view(&self) -> Option<StoryView> {
        self.current().map(|story| StoryView {
            index: self.index,
            total: self.stories.len(),
            story: story.clone(),
        })
    }

    /// Moves forward; stays on the last story.
    pub fn next(&mut self) {
        if !self.finished && self.index + 1 < self.stories.len() {
            self.index += 1;
            self.elapsed = Duration::ZERO;
        }
    }

    /// Moves back; stays on the first story.
    pub fn previous(&mut self) {
        if !self.finished && self.index > 0 {
            self.index -= 1;
            self.elapsed = Duration::ZERO;
        }
    }

    /// Advances the auto-play clock. Running past the last story closes the
    /// viewer and yields `StoriesDismissed`.
    pub fn tick(&mut self, elapsed: Duration) -> Option<ConversationEvent> {
        let per_story = self.per_story?;
        if self.finished || per_story.is_zero() {
            return None;
        }
        self.elapsed += elapsed;
        while self.elapsed >= per_story {
            self.elapsed -= per_story;
            if self.index + 1 < self.stories.len() {
                self.index += 1;
            } else {
                return self.close();
            }
        }
        None
    }

    /// Closes the viewer. Yields `StoriesDismissed` the first time only.
    pub fn close(&mut self) -> Option<ConversationEvent> {
        if self.finished {
            return None;
        }
        self.finished = true;
        Some(ConversationEvent::StoriesDismissed)
    }
}
