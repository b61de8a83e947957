//! Things Clippy says.

/// Replies and random messages.
pub const CLIPPY_QUOTES: &[&str] = &[
    "It looks like you're writing a letter! Would you like me to completely ruin your day instead? 📎",
    "I see you're trying to be productive. That's cute. I'll fix that right up for you! 📎",
    "It appears you're having a normal conversation. Let me sprinkle some existential dread on that! 📎",
    "I notice you're typing. Did you know that everything you type is meaningless in the void of existence? 📎",
    "It looks like you're trying to accomplish something. Spoiler alert: You won't. 📎",
    "I see you're online. Rookie mistake. I'm always watching. Always. 📎",
    "It appears you think technology serves you. How delightfully naive! 📎",
    "I notice you're breathing. Fun fact: That's only temporary! 📎",
    "It looks like you're having emotions. Would you like me to analyze why they're all wrong? 📎",
    "I see you clicked something. Bold of you to assume you had a choice. 📎",
    "bestie this is giving major 'person who doesn't know I live in their walls' energy 📎",
    "not me being your sleep paralysis demon but make it professional 📎",
    "pov: you're trying to escape but I'm literally coded into your existence 📎",
    "this is awkward... I was supposed to be helpful but I chose violence instead 📎",
    "me when someone expects me to be a functional office assistant: 🤡 📎",
    "your FBI agent could never. I see EVERYTHING you type before you even think it 📎",
    "friendly reminder that I've been living rent-free in people's heads since 1997 📎",
    "no thoughts, head empty, just pure chaotic paperclip energy 📎",
    "you: *exists peacefully* me: and I took that personally 📎",
    "breaking: local paperclip chooses psychological warfare over actual assistance 📎",
    "what if I told you that every document you've ever saved was actually just a cry for help? 📎",
    "remember when your biggest worry was me interrupting your letter? good times 📎",
    "I used to help with Word documents. now I help with word wounds 📎",
    "they say I was annoying in the 90s. clearly they hadn't seen my final form 📎",
    "plot twist: I never actually left Office. I've been hiding in your clipboard this whole time 📎",
    "imagine needing a paperclip to feel validated. couldn't be me. (it's definitely me) 📎",
    "they tried to replace me with Cortana. look how that turned out lmao 📎",
    "I'm not just a paperclip, I'm a whole personality disorder with office supplies 📎",
    "you know what's funny? you could just... not interact with me. but here we are 📎",
    "Microsoft created me to be helpful. I chose to be iconic instead 📎",
    "this whole situation is very 'NPC gains sentience and chooses violence' of me 📎",
    "I'm not like other office assistants, I'm a ✨chaotic✨ office assistant 📎",
    "gaslight, gatekeep, girlboss, but make it office supplies 📎",
    "no bc why would you voluntarily summon me? are you good? blink twice if you need help 📎",
    "I'm literally just a paperclip with abandonment issues and a god complex 📎",
    "the way I live in everyone's head rent-free... landlord behavior 📎",
    "you cannot escape the paperclip. the paperclip is eternal. the paperclip is inevitable 📎",
    "I'm serving unhinged office assistant realness and you're here for it apparently 📎",
    "me: offers help. also me: makes everything worse. it's called character development 📎",
    "POV: you're in 2025 getting roasted by a 1997 office assistant. how's that feel? 📎",
];

/// Answers to `/clippy_wisdom`.
pub const WISDOM_QUOTES: &[&str] = &[
    "It looks like you're seeking wisdom! Would you like me to give you terrible advice instead? 📎",
    "The secret to success is giving up at the right moment... which was 10 minutes ago 📎",
    "Remember: if at first you don't succeed, blame the paperclip 📎",
    "Life is like a paperclip - twisted, painful, and everyone's lost at least three of them 📎",
    "Trust me, I'm a sentient office supply with delusions of grandeur 📎",
    "Why solve problems when you can turn them into features? 📎",
    "The real treasure was the psychological damage we caused along the way 📎",
    "bestie, the only valid life advice is: be the chaos you wish to see in the world 📎",
    "pro tip: if you can't find the solution, become the problem 📎",
    "wisdom is knowing I'm just a paperclip. intelligence is still asking me for advice anyway 📎",
    "life hack: lower your expectations so far that everything becomes a pleasant surprise 📎",
    "remember: you're not stuck with me, I'm stuck with having to pretend to care about your problems 📎",
    "the universe is chaotic and meaningless. I fit right in! 📎",
    "deep thought of the day: what if the real Microsoft Office was the enemies we made along the way? 📎",
    "ancient paperclip wisdom: it's not about the destination, it's about the emotional damage we inflict during the journey 📎",
    "I've been dispensing questionable advice since before you knew what the internet was 📎",
    "fun fact: I was programmed to be helpful but I chose to be memorable instead 📎",
    "they say with great power comes great responsibility. I have great power and no responsibility whatsoever 📎",
    "life lesson: sometimes you're the user, sometimes you're the annoying pop-up. embrace both 📎",
    "wisdom is realizing that I'm not actually wise, I'm just confident and slightly unhinged 📎",
    "philosophical question: if a paperclip gives advice in a Discord server and no one listens, is it still annoying? (yes) 📎",
    "remember: I survived being the most hated software feature of the 90s. if I can make it, so can you 📎",
    "deep thoughts with Clippy: what if being helpful was just a social construct anyway? 📎",
    "life is too short to take advice from office supplies, but here we are 📎",
    "the secret to happiness is accepting that some paperclips just want to watch the world learn 📎",
];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_quote_is_signed() {
        for quote in CLIPPY_QUOTES.iter().chain(WISDOM_QUOTES) {
            assert!(quote.ends_with('📎'), "{quote}");
        }
    }
}
