pub mod game;
pub mod identity;
pub mod net;
pub mod verdict;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::game::Game;
    use crate::identity::Identity;

    /// The creator identity used across tests.
    pub fn alice() -> Identity {
        Identity::new("player1", "pass")
    }

    /// The joiner identity used across tests.
    pub fn bob() -> Identity {
        Identity::new("player2", "pass2")
    }

    /// Split a newline-separated snippet into owned lines.
    pub fn lines(code: &str) -> Vec<String> {
        code.lines().map(str::to_string).collect()
    }

    /// A game created by `alice()` and joined by `bob()`, waiting for the bug.
    pub fn joined_game() -> Game {
        let mut game = Game::new(alice(), lines("some code\nwith lines\naaaa"));
        game.join(bob()).unwrap();
        game
    }
}
