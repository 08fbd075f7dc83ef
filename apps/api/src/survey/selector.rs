//! Song selection: orders the eligible songs so that songs with fewer
//! stored responses tend to come first, without ever fixing the order.
//!
//! Each song gets the key `uniform(0, 1) / weight`, where
//! `weight = 1 / (responses + 1)`, and songs are sorted by ascending key.
//! A song with no responses draws its key from `[0, 1)`, a song with ten
//! responses from `[0, 11)`, so heavily answered songs drift towards the back.

use std::collections::HashMap;

use rand::Rng;
use tracing::{error, info};

use crate::models::song::Song;
use crate::store::{SongStore, StoreError};

/// Selection weight for a song that already has `response_count` responses.
/// Strictly positive and decreasing in the count.
pub fn selection_weight(response_count: i64) -> f64 {
    1.0 / (response_count.max(0) as f64 + 1.0)
}

/// Loads the eligible songs and returns them in weighted random order.
/// Any store failure yields an empty list; callers must refuse to start a
/// session on an empty list.
pub async fn select_songs<S: SongStore + ?Sized>(store: &S) -> Vec<Song> {
    let (songs, counts) = match fetch_candidates(store).await {
        Ok(candidates) => candidates,
        Err(e) => {
            error!("Song selection failed: {e}");
            return Vec::new();
        }
    };

    info!(
        "Selected {} eligible songs ({} with prior responses)",
        songs.len(),
        counts.len()
    );
    weighted_order(songs, &counts, &mut rand::thread_rng())
}

async fn fetch_candidates<S: SongStore + ?Sized>(
    store: &S,
) -> Result<(Vec<Song>, HashMap<String, i64>), StoreError> {
    let songs = store.eligible_songs().await?;
    let counts = store.response_counts().await?;
    Ok((songs, counts))
}

/// Sorts `songs` by `uniform(0, 1) / weight` using the given random source.
pub fn weighted_order<R: Rng + ?Sized>(
    songs: Vec<Song>,
    response_counts: &HashMap<String, i64>,
    rng: &mut R,
) -> Vec<Song> {
    let mut keyed: Vec<(f64, Song)> = songs
        .into_iter()
        .map(|song| {
            let count = response_counts.get(&song.id).copied().unwrap_or(0);
            let key = rng.gen::<f64>() / selection_weight(count);
            (key, song)
        })
        .collect();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, song)| song).collect()
}
