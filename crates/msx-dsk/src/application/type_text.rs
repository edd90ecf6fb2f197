//! TypeTextUseCase: plays sanitized lines into the emulator as key events.
//!
//! The keystroke plan comes from [`msx_core::KeystrokeEmitter`]; this use case
//! only turns each [`KeyAction`] into driver calls, one at a time, with the
//! configured pacing.

use std::path::PathBuf;

use msx_core::{KeyAction, KeyCode, KeystrokeEmitter, ModifierState, SanitizedLine};
use tracing::debug;

use super::driver::{DriverError, EmulatorDriver, KeyStroke};
use super::naming::SnapshotNamer;
use super::pacing::{pause, Pacing};

/// Where proof captures go.
#[derive(Debug, Clone, Copy)]
pub struct ProofTarget<'a> {
    pub dir: &'a std::path::Path,
    pub namer: &'a SnapshotNamer,
}

/// WebMSX saves a PNG of the screen on Alt+G.
pub fn capture_trigger() -> KeyStroke {
    KeyStroke::key(KeyCode::KeyG).with_modifier(KeyCode::AltLeft)
}

pub struct TypeTextUseCase<'a> {
    driver: &'a dyn EmulatorDriver,
    pacing: &'a Pacing,
}

/// Result of one typing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedText {
    /// Keyboard modes after the last action; feed into the next run.
    pub state: ModifierState,
    /// Proof captures written, in order.
    pub captures: Vec<PathBuf>,
}

impl<'a> TypeTextUseCase<'a> {
    pub fn new(driver: &'a dyn EmulatorDriver, pacing: &'a Pacing) -> Self {
        Self { driver, pacing }
    }

    /// Types `lines` starting from the keyboard modes in `initial`.
    ///
    /// With a `proof` target, a screen capture is saved after every line.
    ///
    /// # Errors
    ///
    /// Stops at the first failing driver call.  The remote keyboard may then
    /// be left with SHIFT or GRAPH held.
    pub async fn run(
        &self,
        lines: &[SanitizedLine],
        initial: ModifierState,
        proof: Option<ProofTarget<'_>>,
    ) -> Result<TypedText, DriverError> {
        let mut emitter = KeystrokeEmitter::new(lines, initial).with_capture(proof.is_some());
        let mut captures = Vec::new();

        for action in emitter.by_ref() {
            self.perform(action, proof, &mut captures).await?;
        }

        Ok(TypedText { state: emitter.state(), captures })
    }

    async fn perform(
        &self,
        action: KeyAction,
        proof: Option<ProofTarget<'_>>,
        captures: &mut Vec<PathBuf>,
    ) -> Result<(), DriverError> {
        match action {
            KeyAction::ModifierDown(m) => {
                self.driver.key_down(m.key()).await?;
                pause(self.pacing.key_gap).await;
            }
            KeyAction::ModifierUp(m) => {
                self.driver.key_up(m.key()).await?;
                pause(self.pacing.key_gap).await;
            }
            KeyAction::TogglePress(t) => {
                self.driver.press_key(t.key(), self.pacing.key_hold).await?;
                pause(self.pacing.key_gap).await;
            }
            KeyAction::KeyPress(k) => {
                self.driver.press_key(k, self.pacing.key_hold).await?;
                pause(self.pacing.key_gap).await;
            }
            KeyAction::LineBreak => {
                self.driver.press_key(KeyCode::Enter, self.pacing.key_hold).await?;
                pause(self.pacing.line_break).await;
            }
            KeyAction::Capture => {
                if let Some(target) = proof {
                    let path = target.namer.next_path(target.dir, "png");
                    debug!("saving proof capture to {}", path.display());
                    self.driver.download(capture_trigger(), &path).await?;
                    captures.push(path);
                }
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::driver::MockEmulatorDriver;
    use mockall::Sequence;
    use msx_core::sanitize_lines;
    use std::path::Path;

    fn lines(input: &[&str]) -> Vec<SanitizedLine> {
        sanitize_lines(input).unwrap().lines
    }

    #[tokio::test]
    async fn test_shifted_word_holds_shift_once() {
        // Arrange
        let mut driver = MockEmulatorDriver::new();
        let mut seq = Sequence::new();
        driver
            .expect_key_down()
            .withf(|k| *k == KeyCode::ShiftLeft)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        driver
            .expect_press_key()
            .withf(|k, _| *k == KeyCode::KeyA)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        driver
            .expect_press_key()
            .withf(|k, _| *k == KeyCode::KeyB)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        driver
            .expect_key_up()
            .withf(|k| *k == KeyCode::ShiftLeft)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let pacing = Pacing::instant();

        // Act
        let typed = TypeTextUseCase::new(&driver, &pacing)
            .run(&lines(&["AB"]), ModifierState::default(), None)
            .await
            .unwrap();

        // Assert
        assert_eq!(typed.state, ModifierState::default());
        assert!(typed.captures.is_empty());
    }

    #[tokio::test]
    async fn test_line_break_presses_enter() {
        let mut driver = MockEmulatorDriver::new();
        let mut seq = Sequence::new();
        for key in [KeyCode::KeyA, KeyCode::Enter, KeyCode::KeyB] {
            driver
                .expect_press_key()
                .withf(move |k, _| *k == key)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(()));
        }
        let pacing = Pacing::instant();

        TypeTextUseCase::new(&driver, &pacing)
            .run(&lines(&["a", "b"]), ModifierState::default(), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_capture_downloads_png_per_line() {
        // Arrange
        let mut driver = MockEmulatorDriver::new();
        driver.expect_press_key().returning(|_, _| Ok(()));
        driver
            .expect_download()
            .withf(|trigger, path| {
                *trigger == capture_trigger()
                    && path.extension().and_then(|e| e.to_str()) == Some("png")
                    && path.parent() == Some(Path::new("/proof"))
            })
            .times(2)
            .returning(|_, _| Ok(()));
        let pacing = Pacing::instant();
        let namer = SnapshotNamer::new();
        let proof = ProofTarget { dir: Path::new("/proof"), namer: &namer };

        // Act
        let typed = TypeTextUseCase::new(&driver, &pacing)
            .run(&lines(&["a", "b"]), ModifierState::default(), Some(proof))
            .await
            .unwrap();

        // Assert
        assert_eq!(typed.captures.len(), 2);
        assert!(typed.captures[0] < typed.captures[1]);
    }

    #[tokio::test]
    async fn test_kana_state_is_returned() {
        let mut driver = MockEmulatorDriver::new();
        driver.expect_press_key().returning(|_, _| Ok(()));
        let pacing = Pacing::instant();

        let typed = TypeTextUseCase::new(&driver, &pacing)
            .run(&lines(&["カ"]), ModifierState::default(), None)
            .await
            .unwrap();

        assert!(typed.state.kana && typed.state.caps);
    }

    #[tokio::test]
    async fn test_driver_failure_stops_typing() {
        let mut driver = MockEmulatorDriver::new();
        driver
            .expect_press_key()
            .times(1)
            .returning(|_, _| Err(DriverError::Browser("gone".into())));
        let pacing = Pacing::instant();

        let err = TypeTextUseCase::new(&driver, &pacing)
            .run(&lines(&["abc"]), ModifierState::default(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DriverError::Browser(_)));
    }
}
