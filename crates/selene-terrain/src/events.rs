//! Tile load notifications.
//!
//! Completions are recorded in a [`TileEventBuffer`] that is double-buffered
//! per frame, and also pushed to registered callbacks as they happen.

use crate::tile::TileCoord;

/// Something that happened to a tile during [`poll_loads`](crate::TerrainStore::poll_loads).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileEvent {
    /// The tile is now `Loaded` with mips built.
    Loaded(TileCoord),
    /// The fetch failed and the tile went back to `Unloaded`.
    Failed { coord: TileCoord, reason: String },
}

impl TileEvent {
    pub fn coord(&self) -> TileCoord {
        match self {
            TileEvent::Loaded(coord) => *coord,
            TileEvent::Failed { coord, .. } => *coord,
        }
    }
}

/// Double-buffered event storage.
///
/// Events written in the current frame are readable in the current and next
/// frame. Call [`swap`](TileEventBuffer::swap) once per frame.
#[derive(Debug, Default)]
pub struct TileEventBuffer {
    /// Events from the previous frame.
    prev: Vec<TileEvent>,
    /// Events from the current frame.
    current: Vec<TileEvent>,
}

impl TileEventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, event: TileEvent) {
        self.current.push(event);
    }

    /// All readable events (previous + current frame).
    pub fn read(&self) -> impl Iterator<Item = &TileEvent> {
        self.prev.iter().chain(self.current.iter())
    }

    /// Coordinates of tiles that finished loading, previous + current frame.
    pub fn loaded(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.read().filter_map(|event| match event {
            TileEvent::Loaded(coord) => Some(*coord),
            TileEvent::Failed { .. } => None,
        })
    }

    pub fn len(&self) -> usize {
        self.prev.len() + self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance the frame: previous events are dropped, current becomes previous.
    pub fn swap(&mut self) {
        self.prev.clear();
        std::mem::swap(&mut self.prev, &mut self.current);
    }

    pub fn clear(&mut self) {
        self.prev.clear();
        self.current.clear();
    }
}

/// Callback fired on the store's thread after a tile becomes `Loaded`.
pub type TileLoadedCallback = Box<dyn FnMut(TileCoord)>;

/// The single replaceable callback plus any added listeners.
#[derive(Default)]
pub(crate) struct TileListeners {
    callback: Option<TileLoadedCallback>,
    listeners: Vec<TileLoadedCallback>,
}

impl TileListeners {
    pub(crate) fn set_callback(&mut self, callback: TileLoadedCallback) {
        self.callback = Some(callback);
    }

    pub(crate) fn add(&mut self, listener: TileLoadedCallback) {
        self.listeners.push(listener);
    }

    pub(crate) fn notify(&mut self, coord: TileCoord) {
        if let Some(callback) = self.callback.as_mut() {
            callback(coord);
        }
        for listener in &mut self.listeners {
            listener(coord);
        }
    }
}

impl std::fmt::Debug for TileListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileListeners")
            .field("callback", &self.callback.is_some())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
