//! Lifecycle controller: binds a ring to its peripheral, pins and yield point.

use core::cell::Cell;

use critical_section::Mutex;
use platform::{Dividers, I2sPeripheral, SignalPins};

use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::rate::{self, RateState};
use crate::ring::{DmaRing, Reclaimed, StreamStats};

/// A DMA-fed I2S output session over a borrowed [`DmaRing`].
///
/// `start` claims the pins, builds the descriptor chain and sets the engine
/// running at [`StreamConfig::initial_rate_hz`]; `stop` undoes it in reverse.
/// Dropping a running stream stops it.
///
/// All producer-side methods take `&self`, so the stream can be shared with
/// the interrupt handler that calls [`on_completion`](Self::on_completion).
pub struct I2sStream<'r, S, P, Y, const N: usize, const LEN: usize>
where
    S: I2sPeripheral,
    P: SignalPins,
{
    pub(crate) ring: &'r DmaRing<N, LEN>,
    pub(crate) dma: S,
    pins: P,
    pub(crate) yielder: Y,
    config: StreamConfig,
    rate: Mutex<Cell<RateState>>,
    running: bool,
}

impl<'r, S, P, Y, const N: usize, const LEN: usize> I2sStream<'r, S, P, Y, N, LEN>
where
    S: I2sPeripheral,
    P: SignalPins,
{
    /// Bind the collaborators. Nothing touches hardware until [`start`](Self::start).
    pub fn new(ring: &'r DmaRing<N, LEN>, dma: S, pins: P, yielder: Y, config: StreamConfig) -> Self {
        Self {
            ring,
            dma,
            pins,
            yielder,
            config,
            rate: Mutex::new(Cell::new(RateState::RESET)),
            running: false,
        }
    }

    /// Claim the pins, build the chain, program the initial rate and enable
    /// the engine.
    ///
    /// On error nothing stays claimed.
    pub fn start(&mut self) -> Result<(), StreamError> {
        if self.running {
            return Err(StreamError::AlreadyRunning);
        }
        self.config.validate()?;
        crate::pool::BufferPool::<N, LEN>::check_geometry()?;

        self.pins.claim().map_err(|_| {
            warn!("signal pin claim failed");
            StreamError::PinClaim
        })?;

        if let Err(e) = self.ring.activate() {
            self.pins.release();
            return Err(e);
        }

        critical_section::with(|cs| self.rate.borrow(cs).set(RateState::RESET));
        self.set_rate(self.config.initial_rate_hz);

        self.dma.set_descriptor_chain_base(self.ring.pool().base());
        self.dma.arm_completion_signal();
        self.dma.enable_transfer();
        self.running = true;

        info!(
            "i2s stream started: {} buffers x {} words at {} Hz",
            N,
            LEN,
            self.config.initial_rate_hz
        );
        Ok(())
    }

    /// Mask completions, stop the engine, tear down the chain and release the pins.
    pub fn stop(&mut self) -> Result<(), StreamError> {
        if !self.running {
            return Err(StreamError::NotRunning);
        }
        self.dma.disarm_completion_signal();
        self.dma.disable_transfer();
        self.ring.deactivate();
        self.pins.release();
        self.running = false;
        info!("i2s stream stopped");
        Ok(())
    }

    /// Whether [`start`](Self::start) succeeded and [`stop`](Self::stop) has not run since.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Program the divider pair closest to `rate_hz`.
    ///
    /// A no-op when `rate_hz` equals the last requested rate.
    pub fn set_rate(&self, rate_hz: u32) {
        let current = critical_section::with(|cs| self.rate.borrow(cs).get());
        if current.requested_hz == rate_hz {
            return;
        }
        let frame_clock = self.config.frame_clock_hz();
        let dividers = rate::solve_dividers(frame_clock, rate_hz);
        self.dma.program_dividers(dividers);
        critical_section::with(|cs| {
            self.rate.borrow(cs).set(RateState {
                requested_hz: rate_hz,
                dividers: Some(dividers),
            });
        });
        info!(
            "rate {} Hz -> dividers {}/{} ({} Hz)",
            rate_hz,
            dividers.div1(),
            dividers.div2(),
            rate::real_rate(frame_clock, dividers)
        );
    }

    /// Program an explicit divider pair, bypassing the search.
    ///
    /// The next [`set_rate`](Self::set_rate) always reprograms.
    pub fn set_dividers(&self, dividers: Dividers) {
        self.dma.program_dividers(dividers);
        critical_section::with(|cs| {
            self.rate.borrow(cs).set(RateState {
                requested_hz: 0,
                dividers: Some(dividers),
            });
        });
        debug!("manual dividers {}/{}", dividers.div1(), dividers.div2());
    }

    /// Program a raw divider pair, rejecting values outside 1–63.
    ///
    /// Nothing reaches the hardware when either value is out of range.
    pub fn try_set_dividers(&self, div1: u8, div2: u8) -> Result<(), StreamError> {
        let dividers = Dividers::try_new(div1, div2)?;
        self.set_dividers(dividers);
        Ok(())
    }

    /// Rate actually produced by the programmed dividers, in Hz.
    ///
    /// 0.0 before any rate has been programmed.
    pub fn get_real_rate(&self) -> f32 {
        self.rate_state()
            .dividers
            .map_or(0.0, |d| rate::real_rate(self.config.frame_clock_hz(), d))
    }

    /// Requested rate and programmed dividers.
    pub fn rate_state(&self) -> RateState {
        critical_section::with(|cs| self.rate.borrow(cs).get())
    }

    /// Register (or clear) the function called after each reclaimed buffer.
    pub fn set_callback(&self, callback: Option<fn()>) {
        self.ring.set_callback(callback);
    }

    /// Completion interrupt entry point.
    pub fn on_completion(&self) -> Option<Reclaimed> {
        self.ring.on_completion(&self.dma)
    }

    /// Counter snapshot.
    pub fn stats(&self) -> StreamStats {
        self.ring.stats()
    }

    /// The ring this stream drives.
    pub fn ring(&self) -> &'r DmaRing<N, LEN> {
        self.ring
    }

    /// Configuration in effect.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

impl<S, P, Y, const N: usize, const LEN: usize> Drop for I2sStream<'_, S, P, Y, N, LEN>
where
    S: I2sPeripheral,
    P: SignalPins,
{
    fn drop(&mut self) {
        if self.running {
            let _ = self.stop();
        }
    }
}
