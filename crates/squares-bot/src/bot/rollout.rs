//! Depth-limited random-card rollouts.

use crate::bot::error::SearchError;
use crate::bot::resolver::PlacementResolver;
use crate::bot::session::{SearchSession, SessionError};
use rand::Rng;
use squares_core::scoring::PointSystem;

/// Play up to `depth` random future cards, each placed by the greedy
/// resolver, read the (possibly partial) grid score and unwind every
/// simulated placement. The session is left exactly as it was found, also
/// when a step fails.
pub fn simulate<R: Rng + ?Sized>(
    session: &mut SearchSession,
    depth: usize,
    system: &PointSystem,
    resolver: &PlacementResolver,
    rng: &mut R,
) -> Result<i32, SearchError> {
    if depth == 0 {
        return Ok(system.score(session.grid()));
    }

    let steps = depth.min(session.remaining_cells());
    let mut made = 0;
    let mut outcome = Ok(());
    for _ in 0..steps {
        if let Err(err) = step(session, system, resolver, rng) {
            outcome = Err(err);
            break;
        }
        made += 1;
    }

    let score = system.score(session.grid());
    for _ in 0..made {
        session.undo()?;
    }
    outcome.map(|()| score)
}

fn step<R: Rng + ?Sized>(
    session: &mut SearchSession,
    system: &PointSystem,
    resolver: &PlacementResolver,
    rng: &mut R,
) -> Result<(), SearchError> {
    let card = session.draw_random(rng).ok_or(SessionError::GridFull)?;
    let legal = session.legal_plays();
    let cell = resolver.resolve(system, session.grid(), card, legal.as_slice(), rng)?;
    session.place_index(card, cell)?;
    Ok(())
}
