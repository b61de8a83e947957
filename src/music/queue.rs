//! Track queue of a guild and how it is displayed.

use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;

use delegate::delegate;
use serenity::UserId;

use crate::error::UserError;
use crate::serenity;
use crate::util::format_duration;

/// Queue entries shown before the rest is summarized.
pub const QUEUE_DISPLAY_LIMIT: usize = 10;

/// A resolved track, ready to be streamed.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    /// Title of the track.
    pub title: String,
    /// Direct audio url to stream from.
    pub stream_url: String,
    /// Url to the page of the source, may be empty.
    pub page_url: String,
    /// Duration of the track.
    pub duration: Option<Duration>,
    /// The url to the source's thumbnail.
    pub thumbnail: Option<String>,
    /// Who asked for this track.
    pub requester: Option<UserId>,
}

impl Display for Song {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let title = &self.title;
        let duration = match self.duration {
            None => String::new(),
            Some(dur) => format!(" `{}`", format_duration(&dur)),
        };

        if self.page_url.is_empty() {
            write!(f, "**{title}**{duration}")
        } else {
            write!(f, "[**{title}**]({}){duration}", self.page_url)
        }
    }
}

/// Playback volume in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Volume(u8);

impl Volume {
    /// Highest accepted volume.
    pub const MAX: i64 = 100;

    /// Rejects anything outside of `0..=100`.
    pub fn new(percent: i64) -> Result<Self, UserError> {
        match u8::try_from(percent) {
            Ok(p) if i64::from(p) <= Self::MAX => Ok(Self(p)),
            _ => Err(UserError::VolumeOutOfRange { given: percent }),
        }
    }

    /// Like [Volume::new] but clamps instead of failing.
    pub fn clamped(percent: i64) -> Self {
        Self(percent.clamp(0, Self::MAX) as u8)
    }

    /// The volume in percent, `0..=100`.
    pub fn percent(self) -> u8 {
        self.0
    }

    /// Gain handed to the voice driver, where 1.0 is unchanged.
    pub fn gain(self) -> f32 {
        f32::from(self.0) / 100.0
    }
}

impl Display for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// FIFO of songs with the currently playing one kept aside.
#[derive(Debug)]
pub struct TrackQueue {
    /// What is playing (or paused) right now.
    current: Option<Song>,
    /// Songs waiting their turn.
    upcoming: VecDeque<Song>,
    /// Whether `current` is paused.
    paused: bool,
    /// Max length of `upcoming`.
    max_size: usize,
}

impl TrackQueue {
    /// An empty queue holding at most `max_size` waiting songs.
    pub fn new(max_size: usize) -> Self {
        Self {
            current: None,
            upcoming: VecDeque::new(),
            paused: false,
            max_size,
        }
    }

    /// Add to the back of the queue. Returns the song's position among the upcoming ones.
    pub fn push(&mut self, song: Song) -> Result<usize, UserError> {
        if self.upcoming.len() >= self.max_size {
            Err(UserError::QueueFull { max: self.max_size })?
        }
        self.upcoming.push_back(song);
        Ok(self.upcoming.len())
    }

    /// Move the front of the queue into the current slot.
    /// The previous song (if any) is dropped.
    pub fn advance(&mut self) -> Option<&Song> {
        self.current = self.upcoming.pop_front();
        self.paused = false;
        self.current.as_ref()
    }

    /// The song playing (or paused) right now.
    pub fn current(&self) -> Option<&Song> {
        self.current.as_ref()
    }

    /// Whether the current song is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Mark the current song as paused or playing.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Nothing playing and nothing waiting.
    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.upcoming.is_empty()
    }

    /// Drop everything, including the current song.
    pub fn clear(&mut self) {
        self.current = None;
        self.upcoming.clear();
        self.paused = false;
    }

    delegate! {
        to self.upcoming {
            /// Number of songs waiting.
            pub fn len(&self) -> usize;
            /// Songs waiting, in play order.
            #[call(iter)]
            pub fn upcoming(&self) -> std::collections::vec_deque::Iter<'_, Song>;
        }
    }

    /// Lines describing the upcoming songs, at most [QUEUE_DISPLAY_LIMIT] of them
    /// followed by a summary of the rest.
    pub fn upcoming_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .upcoming
            .iter()
            .take(QUEUE_DISPLAY_LIMIT)
            .enumerate()
            .map(|(i, song)| match song.requester {
                Some(user) => format!("`{}.` {song} - <@{user}>", i + 1),
                None => format!("`{}.` {song}", i + 1),
            })
            .collect();

        let hidden = self.upcoming.len().saturating_sub(QUEUE_DISPLAY_LIMIT);
        if hidden > 0 {
            lines.push(format!("... and {hidden} more songs"));
        }
        lines
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub fn song(title: &str) -> Song {
        Song {
            title: title.to_string(),
            stream_url: format!("https://cdn.example/{title}"),
            page_url: String::new(),
            duration: None,
            thumbnail: None,
            requester: None,
        }
    }

    fn titles(queue: &TrackQueue) -> Vec<&str> {
        queue.upcoming().map(|s| s.title.as_str()).collect()
    }

    #[test]
    fn skipping_plays_in_fifo_order() {
        let mut queue = TrackQueue::new(10);
        for t in ["A", "B", "C"] {
            queue.push(song(t)).unwrap();
        }

        assert_eq!(queue.advance().unwrap().title, "A");
        // Skip A
        assert_eq!(queue.advance().unwrap().title, "B");
        assert_eq!(titles(&queue), vec!["C"]);
        assert_eq!(queue.advance().unwrap().title, "C");
        assert!(queue.advance().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn push_reports_position() {
        let mut queue = TrackQueue::new(10);
        assert_eq!(queue.push(song("A")).unwrap(), 1);
        assert_eq!(queue.push(song("B")).unwrap(), 2);
        queue.advance();
        assert_eq!(queue.push(song("C")).unwrap(), 2);
    }

    #[test]
    fn queue_is_bounded() {
        let mut queue = TrackQueue::new(2);
        queue.push(song("A")).unwrap();
        queue.push(song("B")).unwrap();
        let err = queue.push(song("C")).unwrap_err();
        assert!(matches!(err, UserError::QueueFull { max: 2 }));

        // The playing song doesn't count against the limit.
        queue.advance();
        queue.push(song("C")).unwrap();
        assert_eq!(titles(&queue), vec!["B", "C"]);
    }

    #[test]
    fn advancing_unpauses_and_clear_resets() {
        let mut queue = TrackQueue::new(5);
        queue.push(song("A")).unwrap();
        queue.push(song("B")).unwrap();
        queue.advance();
        queue.set_paused(true);
        queue.advance();
        assert!(!queue.is_paused());

        queue.set_paused(true);
        queue.clear();
        assert!(queue.is_empty());
        assert!(!queue.is_paused());
        assert!(queue.current().is_none());
    }

    #[test]
    fn volume_bounds() {
        assert_eq!(Volume::new(0).unwrap().percent(), 0);
        assert_eq!(Volume::new(100).unwrap().percent(), 100);
        assert!((Volume::new(50).unwrap().gain() - 0.5).abs() < f32::EPSILON);
        for bad in [-1, 101, 300, i64::MAX] {
            let err = Volume::new(bad).unwrap_err();
            assert!(matches!(err, UserError::VolumeOutOfRange { given } if given == bad));
        }
        assert_eq!(Volume::clamped(150).percent(), 100);
        assert_eq!(Volume::clamped(-5).percent(), 0);
    }

    #[test]
    fn long_queues_are_summarized() {
        let mut queue = TrackQueue::new(100);
        for i in 0..13 {
            queue.push(song(&format!("song{i}"))).unwrap();
        }
        let lines = queue.upcoming_lines();
        assert_eq!(lines.len(), QUEUE_DISPLAY_LIMIT + 1);
        assert!(lines[0].starts_with("`1.` **song0**"));
        assert_eq!(lines.last().unwrap(), "... and 3 more songs");
    }

    #[test]
    fn song_display_links_page() {
        let mut s = song("A");
        s.duration = Some(Duration::from_secs(65));
        assert_eq!(s.to_string(), "**A** `1:05`");
        s.page_url = "https://youtu.be/x".to_string();
        assert_eq!(s.to_string(), "[**A**](https://youtu.be/x) `1:05`");
    }
}
