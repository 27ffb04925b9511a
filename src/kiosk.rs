use std::{thread, time::Duration};

use anyhow::Context as _;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::{
    catalog::Catalog,
    display::Surface,
    error::PlinthResult,
    freq::FrequencyLog,
    history::History,
    metadata::MetadataReader,
    plaque::{PlaqueRenderer, plaque_fields},
    schedule::Scheduler,
    select::select_subject_and_photo,
};

#[derive(Clone, Copy, Debug)]
pub struct KioskConfig {
    pub subject_history: usize,
    pub photo_history: usize,
    pub swap_interval: Duration,
    pub tick_interval: Duration,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            subject_history: 3,
            photo_history: 10,
            swap_interval: Duration::from_secs(10),
            tick_interval: Duration::from_millis(500),
        }
    }
}

/// The whole kiosk session: catalog, renderer, outputs, histories, counts
/// and the refresh scheduler, owned together and driven from one thread.
pub struct Kiosk {
    catalog: Box<dyn Catalog>,
    renderer: Box<dyn PlaqueRenderer>,
    metadata: Box<dyn MetadataReader>,
    surface: Surface,
    subjects: History,
    photos: History,
    frequency: FrequencyLog,
    scheduler: Scheduler,
    rng: StdRng,
}

enum KeyAction {
    None,
    ForceRefresh,
    Exit,
}

impl Kiosk {
    pub fn new(
        catalog: Box<dyn Catalog>,
        renderer: Box<dyn PlaqueRenderer>,
        metadata: Box<dyn MetadataReader>,
        surface: Surface,
        config: KioskConfig,
        rng: StdRng,
    ) -> PlinthResult<Self> {
        let scheduler = Scheduler::new(config.tick_interval, config.swap_interval)?;
        Ok(Self {
            catalog,
            renderer,
            metadata,
            surface,
            subjects: History::new(config.subject_history),
            photos: History::new(config.photo_history),
            frequency: FrequencyLog::new(),
            scheduler,
            rng,
        })
    }

    /// One full swap: fade the old pair out, select, fetch, render, present
    /// the new pair, count it. Any error is fatal to the process; the driver
    /// never falls back to the previous images.
    pub fn swap(&mut self) -> PlinthResult<()> {
        self.surface.fade_out()?;

        let (subject, entry) = select_subject_and_photo(
            self.catalog.as_ref(),
            &mut self.subjects,
            &mut self.photos,
            &mut self.rng,
        )?;
        info!(subject = %subject.name, photo = %entry.photo, "swapping selection");

        let photo_bytes = self.catalog.fetch_bytes(&entry.photo)?;
        let photo = image::load_from_memory(&photo_bytes)
            .context("decode photo")?
            .to_rgba8();
        let capture = self.metadata.capture_info(&photo_bytes)?;

        let template = self.catalog.fetch_bytes(&entry.plaque_template)?;
        let fields = plaque_fields(&subject, &entry, &capture);
        let plaque = self.renderer.render(&template, &fields)?;

        self.surface.present_pair(&photo, &plaque)?;
        self.frequency.record(&subject.name, &entry.photo);
        Ok(())
    }

    /// Drive the kiosk until an exit key or a fatal error. The idle wait is
    /// the timed event poll itself, so the tick interval is authoritative.
    pub fn run(&mut self) -> PlinthResult<()> {
        self.swap()?;

        let input = match RawModeGuard::enable() {
            Ok(guard) => Some(guard),
            Err(err) => {
                warn!(error = %err, "no interactive terminal, key bindings disabled");
                None
            }
        };

        loop {
            let due = match &input {
                Some(_) => {
                    if event::poll(self.scheduler.tick_interval()).context("poll input events")? {
                        match event::read().context("read input event")? {
                            Event::Key(key) if key.kind == KeyEventKind::Press => {
                                match handle_key(key) {
                                    KeyAction::Exit => {
                                        info!("exit requested");
                                        return Ok(());
                                    }
                                    KeyAction::ForceRefresh => {
                                        info!("forced refresh");
                                        self.scheduler.force();
                                        self.scheduler.due()
                                    }
                                    KeyAction::None => false,
                                }
                            }
                            _ => false,
                        }
                    } else {
                        self.scheduler.on_tick()
                    }
                }
                None => {
                    thread::sleep(self.scheduler.tick_interval());
                    self.scheduler.on_tick()
                }
            };

            if due {
                self.swap()?;
                self.scheduler.swap_done();
            }
        }
    }

    /// Flush the frequency summary. Safe to call more than once; only the
    /// first call prints.
    pub fn shutdown(&mut self) {
        if self.frequency.flush() {
            info!("frequency summary flushed");
        }
    }

    pub fn frequency(&self) -> &FrequencyLog {
        &self.frequency
    }
}

fn handle_key(key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => KeyAction::Exit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Exit,
        KeyCode::Right => KeyAction::ForceRefresh,
        _ => KeyAction::None,
    }
}

/// Raw terminal mode for the lifetime of the run loop, restored on drop even
/// when the loop exits through an error.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> PlinthResult<Self> {
        terminal::enable_raw_mode().context("enable raw terminal mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
