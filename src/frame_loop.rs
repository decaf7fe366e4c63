//! Per-frame step ordering, independent of the GPU backend.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSignal {
    CloseRequested,
    EscapePressed,
}

/// The steps of one frame, run in declaration order.
pub trait FrameStages {
    type Error;

    /// Runs the compute program over the output image.
    fn dispatch(&mut self) -> Result<(), Self::Error>;
    /// Makes the compute writes visible to the display program.
    fn barrier(&mut self) -> Result<(), Self::Error>;
    /// Draws the output image onto the window.
    fn present(&mut self) -> Result<(), Self::Error>;
    fn poll_input(&mut self) -> Option<ExitSignal>;
    fn swap_buffers(&mut self) -> Result<(), Self::Error>;
    /// Releases every resource. Called at most once.
    fn teardown(&mut self);
}

#[derive(Debug)]
pub struct FrameLoop {
    state: LoopState,
    torn_down: bool,
    frames: u64,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameLoop {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: LoopState::Running,
            torn_down: false,
            frames: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Completed iterations.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs one frame. Returns the state after the frame.
    ///
    /// An exit signal or a failing step moves the loop to `Closing` and tears
    /// the stages down before returning.
    pub fn iterate<S: FrameStages>(&mut self, stages: &mut S) -> Result<LoopState, S::Error> {
        if self.state == LoopState::Closing {
            return Ok(self.state);
        }

        match Self::run_steps(stages) {
            Ok(signal) => {
                self.frames += 1;
                if let Some(signal) = signal {
                    tracing::info!("Exit requested ({signal:?}) after {} frames", self.frames);
                    self.shutdown(stages);
                }
                Ok(self.state)
            }
            Err(err) => {
                tracing::error!("Frame {} failed, closing", self.frames);
                self.shutdown(stages);
                Err(err)
            }
        }
    }

    fn run_steps<S: FrameStages>(stages: &mut S) -> Result<Option<ExitSignal>, S::Error> {
        stages.dispatch()?;
        stages.barrier()?;
        stages.present()?;
        let signal = stages.poll_input();
        stages.swap_buffers()?;
        Ok(signal)
    }

    /// Moves to `Closing` and tears down, once.
    pub fn shutdown<S: FrameStages>(&mut self, stages: &mut S) {
        self.state = LoopState::Closing;
        if !self.torn_down {
            self.torn_down = true;
            stages.teardown();
        }
    }
}
