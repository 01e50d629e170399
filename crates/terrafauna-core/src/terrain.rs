//! Biome terrain grid and its seeded region-growth generator.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Terrain category assigned to every tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    Water,
    Desert,
    Snowy,
    Woods,
    Swamp,
    Fields,
}

impl Biome {
    /// Every biome tag, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Water,
        Self::Desert,
        Self::Snowy,
        Self::Woods,
        Self::Swamp,
        Self::Fields,
    ];

    /// Land biomes eligible for palette draws beyond the Water anchor.
    const LAND: [Self; 5] = [Self::Desert, Self::Snowy, Self::Woods, Self::Swamp, Self::Fields];

    #[must_use]
    pub const fn is_water(self) -> bool {
        matches!(self, Self::Water)
    }

    /// Biomes with enough vegetation to sustain grazing.
    #[must_use]
    pub const fn is_fertile(self) -> bool {
        matches!(self, Self::Woods | Self::Swamp | Self::Fields)
    }
}

/// Voronoi seeds planted per palette biome.
const SEEDS_PER_BIOME: usize = 3;
/// Chance that a non-anchor Water seed draw is re-rolled onto a land biome.
const WATER_REROLL_CHANCE: f32 = 0.6;

/// 2D biome grid, immutable during simulation and regenerated on reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainGrid {
    width: u32,
    height: u32,
    palette: Vec<Biome>,
    cells: Vec<Biome>,
}

impl TerrainGrid {
    /// Generate a biome map by seeded region growth.
    ///
    /// A palette of 2-4 unique biomes (always anchored on Water) is chosen,
    /// `3 x |palette|` seed points are planted (the first forced to Water,
    /// later Water draws re-rolled onto land with probability 0.6), and
    /// every cell takes the biome of its nearest seed by squared distance,
    /// ties going to the earliest seed. Zero-area grids are valid and
    /// produce no cells.
    #[must_use]
    pub fn generate(width: u32, height: u32, rng: &mut dyn RngCore) -> Self {
        let palette = Self::roll_palette(rng);
        let len = (width as usize) * (height as usize);
        if len == 0 {
            return Self {
                width,
                height,
                palette,
                cells: Vec::new(),
            };
        }

        let seeds = Self::plant_seeds(width, height, &palette, rng);
        let mut cells = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                let mut nearest = seeds[0].2;
                let mut nearest_dist = i64::MAX;
                for &(sx, sy, biome) in &seeds {
                    let dx = sx - x as i64;
                    let dy = sy - y as i64;
                    let dist = dx * dx + dy * dy;
                    if dist < nearest_dist {
                        nearest_dist = dist;
                        nearest = biome;
                    }
                }
                cells.push(nearest);
            }
        }

        Self {
            width,
            height,
            palette,
            cells,
        }
    }

    /// Single-biome grid, used to bootstrap hand-built scenarios.
    #[must_use]
    pub fn uniform(width: u32, height: u32, biome: Biome) -> Self {
        Self {
            width,
            height,
            palette: vec![biome],
            cells: vec![biome; (width as usize) * (height as usize)],
        }
    }

    fn roll_palette(rng: &mut dyn RngCore) -> Vec<Biome> {
        let target = rng.random_range(2..=4usize);
        let mut palette = vec![Biome::Water];
        while palette.len() < target {
            let candidate = Biome::LAND[rng.random_range(0..Biome::LAND.len())];
            if !palette.contains(&candidate) {
                palette.push(candidate);
            }
        }
        palette
    }

    fn plant_seeds(
        width: u32,
        height: u32,
        palette: &[Biome],
        rng: &mut dyn RngCore,
    ) -> Vec<(i64, i64, Biome)> {
        let land: Vec<Biome> = palette.iter().copied().filter(|b| !b.is_water()).collect();
        let count = SEEDS_PER_BIOME * palette.len();
        let mut seeds = Vec::with_capacity(count);
        for index in 0..count {
            let x = rng.random_range(0..width) as i64;
            let y = rng.random_range(0..height) as i64;
            let biome = if index == 0 {
                // Anchor seed guarantees at least one sizeable water region.
                Biome::Water
            } else {
                let mut draw = palette[rng.random_range(0..palette.len())];
                if draw.is_water()
                    && !land.is_empty()
                    && rng.random::<f32>() < WATER_REROLL_CHANCE
                {
                    draw = land[rng.random_range(0..land.len())];
                }
                draw
            };
            seeds.push((x, y, biome));
        }
        seeds
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Biomes the generator drew this map from.
    #[must_use]
    pub fn palette(&self) -> &[Biome] {
        &self.palette
    }

    /// Row-major cell storage.
    #[must_use]
    pub fn cells(&self) -> &[Biome] {
        &self.cells
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Biome at `(x, y)`, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<Biome> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        if x < self.width && y < self.height {
            Some(self.cells[self.offset(x, y)])
        } else {
            None
        }
    }

    /// Mutable access to a specific cell.
    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut Biome> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        if x < self.width && y < self.height {
            let idx = self.offset(x, y);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// Overwrite every cell with the provided biome.
    pub fn fill(&mut self, biome: Biome) {
        self.cells.fill(biome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};

    #[test]
    fn palette_is_water_anchored_and_bounded() {
        for seed in 0..32 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let grid = TerrainGrid::generate(40, 30, &mut rng);
            let palette = grid.palette();
            assert!(palette.contains(&Biome::Water), "seed={seed}");
            assert!(
                (2..=4).contains(&palette.len()),
                "seed={seed} palette={palette:?}"
            );
            for (index, biome) in palette.iter().enumerate() {
                assert!(
                    !palette[..index].contains(biome),
                    "seed={seed} duplicate {biome:?}"
                );
            }
            assert!(
                grid.cells().iter().all(|cell| palette.contains(cell)),
                "seed={seed} cell outside palette"
            );
        }
    }

    #[test]
    fn generated_grid_contains_water() {
        for seed in 0..16 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let grid = TerrainGrid::generate(48, 32, &mut rng);
            assert!(
                grid.cells().iter().any(|cell| cell.is_water()),
                "seed={seed} produced a dry map"
            );
        }
    }

    #[test]
    fn zero_area_grid_is_valid() {
        let mut rng = SmallRng::seed_from_u64(1);
        let grid = TerrainGrid::generate(0, 12, &mut rng);
        assert_eq!(grid.width(), 0);
        assert_eq!(grid.height(), 12);
        assert!(grid.cells().is_empty());
        assert!(grid.get(0, 0).is_none());
        assert!(grid.palette().contains(&Biome::Water));
    }

    #[test]
    fn cell_access_and_edits() {
        let mut grid = TerrainGrid::uniform(4, 3, Biome::Fields);
        assert_eq!(grid.get(3, 2), Some(Biome::Fields));
        assert!(grid.get(4, 0).is_none());
        assert!(grid.get(-1, 0).is_none());
        *grid.get_mut(1, 1).expect("cell") = Biome::Water;
        assert_eq!(grid.get(1, 1), Some(Biome::Water));
        grid.fill(Biome::Swamp);
        assert!(grid.cells().iter().all(|&cell| cell == Biome::Swamp));
    }
}
