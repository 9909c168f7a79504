use rand::seq::SliceRandom;

const THINKING_MESSAGES: &[&str] = &[
    "Thinking",
    "Reading the room",
    "Consulting the file system",
    "Poking at the shell",
    "Warming up the runtimes",
    "Listing possibilities",
    "Piping thoughts",
    "Checking the working directory",
    "Untangling the request",
    "Drafting a plan",
    "Counting bytes",
    "Tracing paths",
];

pub fn get_random_thinking_message() -> &'static str {
    THINKING_MESSAGES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Thinking")
}
