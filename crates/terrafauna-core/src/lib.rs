//! Core simulation engine for the Terrafauna workspace.
//!
//! The engine owns all mutable ecology state: a biome terrain grid, an
//! immutable species table, and a registry of creatures whose heritable
//! trait genomes drive movement, feeding, predation, and reproduction over
//! discrete steps. Rendering and input live in separate crates and consume
//! the read-only snapshot accessors exposed here.

pub mod genome;
pub mod terrain;

pub use genome::Genome;
pub use terrain::{Biome, TerrainGrid};

use ordered_float::OrderedFloat;
use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

new_key_type! {
    /// Stable handle for creatures backed by a generational slot map.
    pub struct CreatureId;
}

/// Energy drained from a struck target per point of resolved damage.
const DAMAGE_ENERGY_FACTOR: f32 = 5.0;
/// Energy drained from the attacker per point of defensive spines.
const SPINE_RETALIATION_FACTOR: f32 = 3.0;
/// Bonus energy drained from a struck target per point of venom power.
const VENOM_FACTOR: f32 = 2.0;
/// Armor contribution of shell hardness when soaking a hit.
const SHELL_ARMOR_FACTOR: f32 = 2.0;
/// Candidate movement offsets: the 8-neighborhood including diagonals.
const MOVE_DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Numeric identifier referencing a row of the species table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeciesId(pub u32);

/// Dietary strategy shared by every creature of a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Diet {
    Herbivore,
    Carnivore,
    Omnivore,
}

impl Diet {
    /// Forage energy available from a biome for this diet, before the
    /// forage rate and the eater's food efficiency are applied.
    #[must_use]
    pub fn forage_yield(self, biome: Biome) -> f32 {
        match self {
            Self::Herbivore => {
                if biome.is_fertile() {
                    1.0
                } else {
                    0.2
                }
            }
            Self::Omnivore => {
                if biome.is_fertile() {
                    0.7
                } else {
                    0.3
                }
            }
            Self::Carnivore => 0.1,
        }
    }
}

/// Movement medium a species is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locomotion {
    Terrestrial,
    Aquatic,
}

impl Locomotion {
    /// Whether a tile of the given biome is passable for this mode.
    #[must_use]
    pub const fn allows(self, biome: Biome) -> bool {
        match self {
            Self::Aquatic => biome.is_water(),
            Self::Terrestrial => !biome.is_water(),
        }
    }
}

/// Sex of an individual creature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Male => Self::Female,
            Self::Female => Self::Male,
        }
    }
}

/// Immutable species template rolled at world initialization.
///
/// Creatures reference their species by id; shared fields are resolved
/// through the table rather than stamped onto individuals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub id: SpeciesId,
    pub color: [f32; 3],
    pub locomotion: Locomotion,
    pub diet: Diet,
    pub cannibal: bool,
}

/// Mutable per-individual simulation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    pub species: SpeciesId,
    pub x: i32,
    pub y: i32,
    pub sex: Sex,
    pub age: u32,
    pub energy: f32,
    pub alive: bool,
    pub genome: Genome,
}

/// Combined creature and species view handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureSnapshot {
    pub id: CreatureId,
    pub species: SpeciesId,
    pub color: [f32; 3],
    pub diet: Diet,
    pub locomotion: Locomotion,
    pub cannibal: bool,
    pub x: i32,
    pub y: i32,
    pub sex: Sex,
    pub age: u32,
    pub energy: f32,
    pub alive: bool,
    pub genome: Genome,
}

/// Dense, insertion-ordered creature storage with generational handles.
///
/// Iteration order is creation order, and `compact` preserves the relative
/// order of survivors, so the linear-scan queries below stay deterministic
/// across the lifetime of a world. Dead creatures remain in storage (and
/// are skipped by every query) until the next compaction pass.
#[derive(Debug, Default)]
pub struct CreatureArena {
    slots: SlotMap<CreatureId, usize>,
    handles: Vec<CreatureId>,
    rows: Vec<Creature>,
}

impl CreatureArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored creatures, dead rows included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns true if `id` refers to a stored creature.
    #[must_use]
    pub fn contains(&self, id: CreatureId) -> bool {
        self.slots.contains_key(id)
    }

    /// Dense index of `id`, if present.
    #[must_use]
    pub fn index_of(&self, id: CreatureId) -> Option<usize> {
        self.slots.get(id).copied()
    }

    /// Handle stored at dense index `index`.
    #[must_use]
    pub fn handle_at(&self, index: usize) -> Option<CreatureId> {
        self.handles.get(index).copied()
    }

    /// Iterate handles in insertion order.
    pub fn iter_handles(&self) -> impl Iterator<Item = CreatureId> + '_ {
        self.handles.iter().copied()
    }

    /// Iterate `(handle, creature)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (CreatureId, &Creature)> {
        self.handles.iter().copied().zip(self.rows.iter())
    }

    #[must_use]
    pub fn get(&self, id: CreatureId) -> Option<&Creature> {
        let index = self.index_of(id)?;
        self.rows.get(index)
    }

    #[must_use]
    pub fn get_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        let index = self.index_of(id)?;
        self.rows.get_mut(index)
    }

    /// Append a creature, returning its handle.
    pub fn insert(&mut self, creature: Creature) -> CreatureId {
        let index = self.rows.len();
        self.rows.push(creature);
        let id = self.slots.insert(index);
        self.handles.push(id);
        id
    }

    /// Produce a copy of the creature identified by `id`.
    #[must_use]
    pub fn snapshot(&self, id: CreatureId) -> Option<Creature> {
        self.get(id).cloned()
    }

    /// First *other* living creature within `radius` of `id`, scanned in
    /// registry iteration order. This is deliberately a first-match linear
    /// scan, not a nearest-neighbor search.
    #[must_use]
    pub fn find_nearby(&self, id: CreatureId, radius: f32) -> Option<CreatureId> {
        let origin = self.get(id)?;
        let radius_sq = radius * radius;
        for (other_id, other) in self.iter() {
            if other_id == id || !other.alive {
                continue;
            }
            let dx = (other.x - origin.x) as f32;
            let dy = (other.y - origin.y) as f32;
            if dx * dx + dy * dy <= radius_sq {
                return Some(other_id);
            }
        }
        None
    }

    /// First living creature of the same species and opposite sex adjacent
    /// to `id` (8-neighborhood) holding at least `energy_fraction` of its
    /// own stomach capacity.
    #[must_use]
    pub fn find_mate(&self, id: CreatureId, energy_fraction: f32) -> Option<CreatureId> {
        let origin = self.get(id)?;
        for (other_id, other) in self.iter() {
            if other_id == id || !other.alive {
                continue;
            }
            if other.species != origin.species || other.sex == origin.sex {
                continue;
            }
            if (other.x - origin.x).abs() > 1 || (other.y - origin.y).abs() > 1 {
                continue;
            }
            if other.energy >= energy_fraction * other.genome.stomach_capacity {
                return Some(other_id);
            }
        }
        None
    }

    /// Closest living creature within `max_dist` of a world point. Unlike
    /// [`Self::find_nearby`] this IS a nearest-match query; it backs
    /// presentation-layer inspection lookups.
    #[must_use]
    pub fn nearest_living(&self, x: f32, y: f32, max_dist: f32) -> Option<CreatureId> {
        let limit = OrderedFloat(max_dist * max_dist);
        self.iter()
            .filter(|(_, creature)| creature.alive)
            .map(|(id, creature)| {
                let dx = creature.x as f32 - x;
                let dy = creature.y as f32 - y;
                (id, OrderedFloat(dx * dx + dy * dy))
            })
            .filter(|&(_, dist_sq)| dist_sq <= limit)
            .min_by_key(|&(_, dist_sq)| dist_sq)
            .map(|(id, _)| id)
    }

    /// Remove all dead rows, preserving the relative order of survivors
    /// and invalidating the handles of the removed. Returns how many rows
    /// were dropped.
    pub fn compact(&mut self) -> usize {
        let mut write = 0;
        for read in 0..self.rows.len() {
            if !self.rows[read].alive {
                self.slots.remove(self.handles[read]);
                continue;
            }
            if write != read {
                self.rows.swap(read, write);
                self.handles.swap(read, write);
            }
            if let Some(slot) = self.slots.get_mut(self.handles[write]) {
                *slot = write;
            }
            write += 1;
        }
        let removed = self.rows.len() - write;
        self.rows.truncate(write);
        self.handles.truncate(write);
        removed
    }

    /// Drop every stored creature.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.handles.clear();
        self.rows.clear();
    }
}

/// Errors raised when constructing engine state.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Indicates a nonsensical configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Static configuration for a terrafauna world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Width of the terrain grid in tiles.
    pub world_width: u32,
    /// Height of the terrain grid in tiles.
    pub world_height: u32,
    /// Number of species rolled at initialization and on reset.
    pub species_count: u32,
    /// Founder creatures placed per species.
    pub creatures_per_species: u32,
    /// Chance that a rolled species is aquatic.
    pub aquatic_species_chance: f32,
    /// Chance that a rolled species preys on its own kind.
    pub cannibal_chance: f32,
    /// Bounded search attempts when placing a founder on matching terrain
    /// before falling back to an unconstrained tile.
    pub placement_attempts: u32,
    /// Optional RNG seed for reproducible worlds.
    pub rng_seed: Option<u64>,
    /// Steps between dead-creature compaction passes.
    pub compaction_interval: u32,
    /// Simulated years elapsed per step.
    pub year_per_step: f64,
    /// Baseline chance that a creature attempts a move each step.
    pub movement_base_chance: f32,
    /// Additional movement chance per point of curiosity.
    pub movement_curiosity_weight: f32,
    /// Upkeep multiplier omnivores pay for dietary flexibility.
    pub omnivore_upkeep_factor: f32,
    /// Fraction of a biome's forage value converted to energy per step.
    pub forage_rate: f32,
    /// Attack roll chance per point of aggression.
    pub predation_aggression_weight: f32,
    /// Radius scanned for prey.
    pub predation_radius: f32,
    /// Flat energy reward for a kill, scaled by the attacker's food
    /// efficiency and independent of prey size.
    pub kill_energy_reward: f32,
    /// Stomach fraction a creature must exceed before attempting
    /// reproduction.
    pub reproduction_energy_fraction: f32,
    /// Stomach fraction a prospective mate must hold to be eligible.
    pub mate_energy_fraction: f32,
    /// Chance that a newborn genome is additionally mutated after
    /// crossover.
    pub offspring_mutation_chance: f32,
    /// Energy granted to newly spawned creatures.
    pub spawn_energy: f32,
    /// Steps between summary recordings; 0 disables summaries.
    pub summary_interval: u32,
    /// Maximum number of recent step summaries retained in memory.
    pub history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_width: 120,
            world_height: 80,
            species_count: 5,
            creatures_per_species: 12,
            aquatic_species_chance: 0.3,
            cannibal_chance: 0.15,
            placement_attempts: 1_000,
            rng_seed: None,
            compaction_interval: 5,
            year_per_step: 0.01,
            movement_base_chance: 0.2,
            movement_curiosity_weight: 0.3,
            omnivore_upkeep_factor: 1.3,
            forage_rate: 0.5,
            predation_aggression_weight: 0.05,
            predation_radius: 1.0,
            kill_energy_reward: 30.0,
            reproduction_energy_fraction: 0.7,
            mate_energy_fraction: 0.5,
            offspring_mutation_chance: 0.4,
            spawn_energy: 50.0,
            summary_interval: 1,
            history_capacity: 256,
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if self.compaction_interval == 0 {
            return Err(EngineError::InvalidConfig(
                "compaction_interval must be non-zero",
            ));
        }
        if self.placement_attempts == 0 {
            return Err(EngineError::InvalidConfig(
                "placement_attempts must be non-zero",
            ));
        }
        if self.history_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "history_capacity must be non-zero",
            ));
        }
        let fractions = [
            self.aquatic_species_chance,
            self.cannibal_chance,
            self.movement_base_chance,
            self.reproduction_energy_fraction,
            self.mate_energy_fraction,
            self.offspring_mutation_chance,
        ];
        if fractions.iter().any(|value| !(0.0..=1.0).contains(value)) {
            return Err(EngineError::InvalidConfig(
                "chance and fraction parameters must lie in [0, 1]",
            ));
        }
        if self.movement_curiosity_weight < 0.0
            || self.predation_aggression_weight < 0.0
            || self.predation_radius < 0.0
            || self.forage_rate < 0.0
            || self.kill_energy_reward < 0.0
            || self.spawn_energy < 0.0
        {
            return Err(EngineError::InvalidConfig(
                "weights, rates, and rewards must be non-negative",
            ));
        }
        if self.omnivore_upkeep_factor <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "omnivore_upkeep_factor must be positive",
            ));
        }
        if self.year_per_step < 0.0 {
            return Err(EngineError::InvalidConfig(
                "year_per_step must be non-negative",
            ));
        }
        Ok(())
    }

    /// Returns the configured RNG, seeding from entropy when no seed is set.
    fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::seed_from_u64(rand::random()),
        }
    }
}

/// Simulation step counter (whole passes over the population).
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct Step(pub u64);

impl Step {
    /// Returns the next sequential step.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Resets the counter back to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// Events emitted after processing one whole simulation step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StepEvents {
    pub step: Step,
    pub births: usize,
    pub deaths: usize,
    /// Rows removed by compaction, when the cadence fired this step.
    pub compacted: Option<usize>,
}

/// Aggregate population sample retained in the summary history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepSummary {
    pub step: Step,
    pub year: f64,
    pub alive: usize,
    pub births: usize,
    pub deaths: usize,
    pub total_energy: f32,
    pub mean_energy: f32,
}

/// Aggregate world state owned by the simulation and read, once per frame,
/// by presentation layers.
pub struct SimulationState {
    config: EngineConfig,
    rng: SmallRng,
    terrain: TerrainGrid,
    species: Vec<Species>,
    creatures: CreatureArena,
    step: Step,
    year: f64,
    births_this_step: usize,
    deaths_this_step: usize,
    history: VecDeque<StepSummary>,
}

impl fmt::Debug for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationState")
            .field("step", &self.step)
            .field("year", &self.year)
            .field("species", &self.species.len())
            .field("creatures", &self.creatures.len())
            .finish()
    }
}

impl SimulationState {
    /// Instantiate a world from the supplied configuration: validate it,
    /// generate terrain, roll the species table, and place the founder
    /// population.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let mut rng = config.seeded_rng();
        let terrain = TerrainGrid::generate(config.world_width, config.world_height, &mut rng);
        let history_capacity = config.history_capacity;
        let mut state = Self {
            config,
            rng,
            terrain,
            species: Vec::new(),
            creatures: CreatureArena::new(),
            step: Step::zero(),
            year: 0.0,
            births_this_step: 0,
            deaths_this_step: 0,
            history: VecDeque::with_capacity(history_capacity),
        };
        state.roll_species();
        state.place_founders();
        Ok(state)
    }

    /// Discard all simulation state and regenerate terrain, species, and
    /// population from scratch, resetting the clock to zero.
    pub fn reset(&mut self) {
        self.terrain = TerrainGrid::generate(
            self.config.world_width,
            self.config.world_height,
            &mut self.rng,
        );
        self.species.clear();
        self.creatures.clear();
        self.history.clear();
        self.step = Step::zero();
        self.year = 0.0;
        self.births_this_step = 0;
        self.deaths_this_step = 0;
        self.roll_species();
        self.place_founders();
    }

    fn roll_species(&mut self) {
        for _ in 0..self.config.species_count {
            let locomotion = if self.rng.random::<f32>() < self.config.aquatic_species_chance {
                Locomotion::Aquatic
            } else {
                Locomotion::Terrestrial
            };
            let diet = match self.rng.random_range(0..3u8) {
                0 => Diet::Herbivore,
                1 => Diet::Carnivore,
                _ => Diet::Omnivore,
            };
            let cannibal = self.rng.random::<f32>() < self.config.cannibal_chance;
            self.add_species(locomotion, diet, cannibal);
        }
    }

    /// Register an additional species template, returning its id.
    pub fn add_species(
        &mut self,
        locomotion: Locomotion,
        diet: Diet,
        cannibal: bool,
    ) -> SpeciesId {
        let id = SpeciesId(self.species.len() as u32);
        let color = [
            self.rng.random::<f32>(),
            self.rng.random::<f32>(),
            self.rng.random::<f32>(),
        ];
        self.species.push(Species {
            id,
            color,
            locomotion,
            diet,
            cannibal,
        });
        id
    }

    fn place_founders(&mut self) {
        if self.terrain.width() == 0 || self.terrain.height() == 0 {
            return;
        }
        let templates: Vec<(SpeciesId, Locomotion)> = self
            .species
            .iter()
            .map(|species| (species.id, species.locomotion))
            .collect();
        for (species_id, locomotion) in templates {
            for _ in 0..self.config.creatures_per_species {
                let (x, y) = self.place_on_matching_tile(locomotion);
                let sex = if self.rng.random::<bool>() {
                    Sex::Male
                } else {
                    Sex::Female
                };
                let founder = Genome::founder(&mut self.rng);
                self.spawn_creature(species_id, x, y, sex, founder);
            }
        }
    }

    /// Draw a random tile matching the locomotion constraint, falling back
    /// to an unconstrained tile once the bounded search is exhausted.
    fn place_on_matching_tile(&mut self, locomotion: Locomotion) -> (i32, i32) {
        let width = self.terrain.width();
        let height = self.terrain.height();
        for _ in 0..self.config.placement_attempts {
            let x = self.rng.random_range(0..width) as i32;
            let y = self.rng.random_range(0..height) as i32;
            if let Some(biome) = self.terrain.get(x, y)
                && locomotion.allows(biome)
            {
                return (x, y);
            }
        }
        (
            self.rng.random_range(0..width) as i32,
            self.rng.random_range(0..height) as i32,
        )
    }

    /// Append a live creature to the registry, returning its handle. Spawn
    /// energy is clamped to the genome's stomach capacity.
    pub fn spawn_creature(
        &mut self,
        species: SpeciesId,
        x: i32,
        y: i32,
        sex: Sex,
        genome: Genome,
    ) -> CreatureId {
        let energy = self.config.spawn_energy.min(genome.stomach_capacity);
        self.creatures.insert(Creature {
            species,
            x,
            y,
            sex,
            age: 0,
            energy,
            alive: true,
            genome,
        })
    }

    /// Advance the clock by `steps` whole steps.
    pub fn advance(&mut self, steps: u32) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Execute one whole simulation step over the live population.
    ///
    /// The pass is index-bounded: creatures appended by same-step
    /// reproduction are not ticked until the next step. Compaction runs
    /// only at step boundaries on the configured cadence, never mid-step.
    pub fn step(&mut self) -> StepEvents {
        let next = self.step.next();
        self.births_this_step = 0;
        self.deaths_this_step = 0;

        let ticked = self.creatures.len();
        for index in 0..ticked {
            if let Some(id) = self.creatures.handle_at(index) {
                self.tick_creature(id);
            }
        }

        self.year += self.config.year_per_step;
        let compacted = if next.0.is_multiple_of(self.config.compaction_interval as u64) {
            Some(self.creatures.compact())
        } else {
            None
        };

        self.record_summary(next);
        self.step = next;
        StepEvents {
            step: next,
            births: self.births_this_step,
            deaths: self.deaths_this_step,
            compacted,
        }
    }

    /// Run one creature through the behavior pipeline: upkeep and death
    /// check, regeneration, movement, feeding, predation, reproduction.
    fn tick_creature(&mut self, id: CreatureId) {
        let Some(creature) = self.creatures.get(id) else {
            return;
        };
        if !creature.alive {
            return;
        }
        let Some(species) = self
            .species
            .get(creature.species.0 as usize)
            .copied()
        else {
            return;
        };

        if !self.stage_upkeep(id, species.diet) {
            return;
        }
        self.stage_movement(id, species.locomotion);
        self.stage_feeding(id, species.diet);
        self.stage_predation(id, species);
        self.stage_reproduction(id);
    }

    /// Age the creature, charge metabolic upkeep, and apply regeneration.
    /// Returns false when the creature died this stage.
    fn stage_upkeep(&mut self, id: CreatureId, diet: Diet) -> bool {
        let upkeep_factor = self.config.omnivore_upkeep_factor;
        let Some(creature) = self.creatures.get_mut(id) else {
            return false;
        };
        creature.age += 1;
        let mut hunger = creature.genome.metabolism_rate;
        if diet == Diet::Omnivore {
            hunger *= upkeep_factor;
        }
        creature.energy -= hunger;
        if creature.age as f32 > creature.genome.max_age || creature.energy <= 0.0 {
            creature.alive = false;
            creature.energy = creature.energy.max(0.0);
            self.deaths_this_step += 1;
            return false;
        }
        creature.energy =
            (creature.energy + creature.genome.regen_rate).min(creature.genome.stomach_capacity);
        true
    }

    /// Roll a movement attempt into one of the eight neighboring tiles. The
    /// clamped destination is taken only when its biome matches the
    /// creature's movement mode; otherwise the creature stays put (no
    /// retry).
    fn stage_movement(&mut self, id: CreatureId, locomotion: Locomotion) {
        let width = self.terrain.width();
        let height = self.terrain.height();
        if width == 0 || height == 0 {
            return;
        }
        let Some(creature) = self.creatures.get(id) else {
            return;
        };
        let chance = self.config.movement_base_chance
            + self.config.movement_curiosity_weight * creature.genome.curiosity;
        let (x, y) = (creature.x, creature.y);
        if self.rng.random::<f32>() >= chance {
            return;
        }
        let (dx, dy) = MOVE_DIRECTIONS[self.rng.random_range(0..MOVE_DIRECTIONS.len())];
        let nx = (x + dx).clamp(0, width as i32 - 1);
        let ny = (y + dy).clamp(0, height as i32 - 1);
        let Some(destination) = self.terrain.get(nx, ny) else {
            return;
        };
        if !locomotion.allows(destination) {
            return;
        }
        if let Some(creature) = self.creatures.get_mut(id) {
            creature.x = nx;
            creature.y = ny;
        }
    }

    /// Convert the current tile's forage value into energy.
    fn stage_feeding(&mut self, id: CreatureId, diet: Diet) {
        let forage_rate = self.config.forage_rate;
        let Some(creature) = self.creatures.get_mut(id) else {
            return;
        };
        let Some(biome) = self.terrain.get(creature.x, creature.y) else {
            return;
        };
        let gain = diet.forage_yield(biome) * forage_rate * creature.genome.food_efficiency;
        creature.energy = (creature.energy + gain).min(creature.genome.stomach_capacity);
    }

    /// Roll an attack attempt against the first nearby creature, gated on
    /// the attacker's diet and the cross-species/cannibalism rules.
    fn stage_predation(&mut self, id: CreatureId, species: Species) {
        let Some(creature) = self.creatures.get(id) else {
            return;
        };
        let roll_chance = creature.genome.aggression * self.config.predation_aggression_weight;
        if self.rng.random::<f32>() >= roll_chance {
            return;
        }
        let Some(target_id) = self
            .creatures
            .find_nearby(id, self.config.predation_radius)
        else {
            return;
        };
        if !matches!(species.diet, Diet::Carnivore | Diet::Omnivore) {
            return;
        }
        let Some(target) = self.creatures.get(target_id) else {
            return;
        };
        if target.species == species.id && !species.cannibal {
            return;
        }
        self.resolve_attack(id, target_id);
    }

    /// Resolve one attack: armor and shell soak the hit, spines retaliate,
    /// venom adds a rider, and a finishing blow pays the attacker a flat
    /// reward scaled by its food efficiency.
    fn resolve_attack(&mut self, attacker_id: CreatureId, target_id: CreatureId) {
        let Some(attacker) = self.creatures.get(attacker_id) else {
            return;
        };
        let Some(target) = self.creatures.get(target_id) else {
            return;
        };
        let damage = (attacker.genome.attack_damage + attacker.genome.bite_force
            - (target.genome.armor + SHELL_ARMOR_FACTOR * target.genome.shell_hardness))
            .max(0.0);
        if damage <= 0.0 {
            return;
        }
        let spines = target.genome.spine_damage;
        let venom = if attacker.genome.has_venom && attacker.genome.venom_power > 0.0 {
            attacker.genome.venom_power * VENOM_FACTOR
        } else {
            0.0
        };
        let kill_reward = self.config.kill_energy_reward;

        let mut target_killed = false;
        if let Some(target) = self.creatures.get_mut(target_id) {
            target.energy -= damage * DAMAGE_ENERGY_FACTOR;
            target.energy -= venom;
            if target.energy <= 0.0 {
                target.energy = 0.0;
                target.alive = false;
                target_killed = true;
                self.deaths_this_step += 1;
            }
        }

        if let Some(attacker) = self.creatures.get_mut(attacker_id) {
            if spines > 0.0 {
                attacker.energy -= spines * SPINE_RETALIATION_FACTOR;
                if attacker.energy <= 0.0 {
                    attacker.energy = 0.0;
                    attacker.alive = false;
                    self.deaths_this_step += 1;
                }
            }
            if target_killed && attacker.alive {
                attacker.energy = (attacker.energy
                    + kill_reward * attacker.genome.food_efficiency)
                    .min(attacker.genome.stomach_capacity);
            }
        }
    }

    /// Attempt reproduction: the periodic age window must be open, energy
    /// must exceed the configured stomach fraction, and a mate must be
    /// adjacent. Both parents pay half their energy once, regardless of
    /// litter size.
    fn stage_reproduction(&mut self, id: CreatureId) {
        let mate_fraction = self.config.mate_energy_fraction;
        let mutation_chance = self.config.offspring_mutation_chance;

        let (species, x, y, genome_a) = {
            let Some(creature) = self.creatures.get(id) else {
                return;
            };
            if !creature.alive {
                return;
            }
            if creature.energy
                <= self.config.reproduction_energy_fraction * creature.genome.stomach_capacity
            {
                return;
            }
            let cooldown = creature.genome.repro_cooldown.round().max(1.0) as u32;
            if !creature.age.is_multiple_of(cooldown) {
                return;
            }
            (
                creature.species,
                creature.x,
                creature.y,
                creature.genome.clone(),
            )
        };

        let Some(mate_id) = self.creatures.find_mate(id, mate_fraction) else {
            return;
        };
        let Some(genome_b) = self.creatures.get(mate_id).map(|mate| mate.genome.clone()) else {
            return;
        };

        let litter =
            ((genome_a.offspring_per_cycle + genome_b.offspring_per_cycle) / 2.0).round() as u32;
        for _ in 0..litter {
            let sex = if self.rng.random::<bool>() {
                Sex::Male
            } else {
                Sex::Female
            };
            let mut child = Genome::crossover(&genome_a, &genome_b, &mut self.rng);
            if self.rng.random::<f32>() < mutation_chance {
                child = child.mutate(&mut self.rng);
            }
            self.spawn_creature(species, x, y, sex, child);
            self.births_this_step += 1;
        }

        if let Some(parent) = self.creatures.get_mut(id) {
            parent.energy *= 0.5;
        }
        if let Some(mate) = self.creatures.get_mut(mate_id) {
            mate.energy *= 0.5;
        }
    }

    fn record_summary(&mut self, step: Step) {
        let interval = self.config.summary_interval;
        if interval == 0 || !step.0.is_multiple_of(interval as u64) {
            return;
        }
        let mut alive = 0usize;
        let mut total_energy = 0.0f32;
        for (_, creature) in self.creatures.iter() {
            if creature.alive {
                alive += 1;
                total_energy += creature.energy;
            }
        }
        let mean_energy = if alive > 0 {
            total_energy / alive as f32
        } else {
            0.0
        };
        let summary = StepSummary {
            step,
            year: self.year,
            alive,
            births: self.births_this_step,
            deaths: self.deaths_this_step,
            total_energy,
            mean_energy,
        };
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary);
    }

    /// Returns an immutable reference to configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Mutable access to the configuration (for hot edits between steps).
    #[must_use]
    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    /// Current simulation step.
    #[must_use]
    pub const fn current_step(&self) -> Step {
        self.step
    }

    /// Fractional year counter advanced on every step.
    #[must_use]
    pub const fn year(&self) -> f64 {
        self.year
    }

    /// Borrow the world RNG mutably for deterministic sampling.
    #[must_use]
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Read-only access to the terrain grid.
    #[must_use]
    pub fn terrain(&self) -> &TerrainGrid {
        &self.terrain
    }

    /// Mutable access to the terrain grid (scenario setup and tooling).
    #[must_use]
    pub fn terrain_mut(&mut self) -> &mut TerrainGrid {
        &mut self.terrain
    }

    /// The immutable species table.
    #[must_use]
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    /// Number of species in the table.
    #[must_use]
    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    /// Read-only access to the creature registry.
    #[must_use]
    pub fn creatures(&self) -> &CreatureArena {
        &self.creatures
    }

    /// Mutable access to the creature registry.
    #[must_use]
    pub fn creatures_mut(&mut self) -> &mut CreatureArena {
        &mut self.creatures
    }

    /// Number of living creatures.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.creatures
            .iter()
            .filter(|(_, creature)| creature.alive)
            .count()
    }

    /// Iterate over retained step summaries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &StepSummary> {
        self.history.iter()
    }

    /// Closest living creature within `max_dist` of a world point, for
    /// inspection-style lookups.
    #[must_use]
    pub fn creature_near(&self, x: f32, y: f32, max_dist: f32) -> Option<CreatureId> {
        self.creatures.nearest_living(x, y, max_dist)
    }

    /// Produce the combined creature/species view for `id`.
    #[must_use]
    pub fn snapshot_creature(&self, id: CreatureId) -> Option<CreatureSnapshot> {
        let creature = self.creatures.get(id)?;
        let species = self.species.get(creature.species.0 as usize)?;
        Some(CreatureSnapshot {
            id,
            species: species.id,
            color: species.color,
            diet: species.diet,
            locomotion: species.locomotion,
            cannibal: species.cannibal,
            x: creature.x,
            y: creature.y,
            sex: creature.sex,
            age: creature.age,
            energy: creature.energy,
            alive: creature.alive,
            genome: creature.genome.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_creature(x: i32, y: i32) -> Creature {
        Creature {
            species: SpeciesId(0),
            x,
            y,
            sex: Sex::Female,
            age: 0,
            energy: 60.0,
            alive: true,
            genome: Genome::baseline(),
        }
    }

    fn quiet_config() -> EngineConfig {
        EngineConfig {
            world_width: 12,
            world_height: 10,
            species_count: 0,
            creatures_per_species: 0,
            rng_seed: Some(5),
            movement_base_chance: 0.0,
            movement_curiosity_weight: 0.0,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn arena_insert_preserves_creation_order() {
        let mut arena = CreatureArena::new();
        let a = arena.insert(sample_creature(0, 0));
        let b = arena.insert(sample_creature(1, 0));
        let c = arena.insert(sample_creature(2, 0));
        assert_ne!(a, b);
        assert_eq!(arena.len(), 3);
        let order: Vec<_> = arena.iter_handles().collect();
        assert_eq!(order, vec![a, b, c]);
        assert_eq!(arena.index_of(c), Some(2));
        assert_eq!(arena.handle_at(1), Some(b));
    }

    #[test]
    fn compact_preserves_survivor_order_and_drops_handles() {
        let mut arena = CreatureArena::new();
        let ids: Vec<_> = (0..5).map(|i| arena.insert(sample_creature(i, 0))).collect();
        arena.get_mut(ids[1]).expect("creature").alive = false;
        arena.get_mut(ids[3]).expect("creature").alive = false;

        let removed = arena.compact();
        assert_eq!(removed, 2);
        assert_eq!(arena.len(), 3);
        let survivors: Vec<_> = arena.iter_handles().collect();
        assert_eq!(survivors, vec![ids[0], ids[2], ids[4]]);
        assert!(!arena.contains(ids[1]));
        assert!(!arena.contains(ids[3]));
        assert_eq!(arena.get(ids[4]).expect("creature").x, 4);
        assert_eq!(arena.index_of(ids[4]), Some(2));
    }

    #[test]
    fn find_nearby_returns_first_match_in_registry_order() {
        let mut arena = CreatureArena::new();
        let origin = arena.insert(sample_creature(0, 0));
        let farther = arena.insert(sample_creature(1, 1));
        let closer = arena.insert(sample_creature(0, 1));

        // Both are in range; the earlier-registered creature wins even
        // though the later one is strictly closer.
        let found = arena.find_nearby(origin, 1.5).expect("neighbor");
        assert_eq!(found, farther);
        assert_ne!(found, closer);
    }

    #[test]
    fn find_nearby_skips_dead_self_and_out_of_range() {
        let mut arena = CreatureArena::new();
        let origin = arena.insert(sample_creature(0, 0));
        let corpse = arena.insert(sample_creature(1, 0));
        arena.get_mut(corpse).expect("creature").alive = false;
        let distant = arena.insert(sample_creature(9, 9));

        assert_eq!(arena.find_nearby(origin, 1.0), None);
        let living = arena.insert(sample_creature(0, 1));
        assert_eq!(arena.find_nearby(origin, 1.0), Some(living));
        assert_ne!(arena.find_nearby(origin, 1.0), Some(distant));
    }

    #[test]
    fn find_mate_filters_species_sex_distance_and_energy() {
        let mut arena = CreatureArena::new();
        let seeker = arena.insert(sample_creature(5, 5));

        // Wrong species, adjacent.
        let mut foreign = sample_creature(5, 6);
        foreign.species = SpeciesId(1);
        foreign.sex = Sex::Male;
        arena.insert(foreign);

        // Same sex, adjacent.
        arena.insert(sample_creature(6, 5));

        // Right pairing but starving.
        let mut starving = sample_creature(4, 5);
        starving.sex = Sex::Male;
        starving.energy = 10.0;
        arena.insert(starving);

        // Right pairing but too far.
        let mut distant = sample_creature(8, 5);
        distant.sex = Sex::Male;
        arena.insert(distant);

        assert_eq!(arena.find_mate(seeker, 0.5), None);

        let mut suitor = sample_creature(6, 6);
        suitor.sex = Sex::Male;
        suitor.energy = 80.0;
        let suitor_id = arena.insert(suitor);
        assert_eq!(arena.find_mate(seeker, 0.5), Some(suitor_id));
    }

    #[test]
    fn nearest_living_returns_closest_within_range() {
        let mut arena = CreatureArena::new();
        let far = arena.insert(sample_creature(8, 8));
        let corpse = arena.insert(sample_creature(1, 1));
        arena.get_mut(corpse).expect("creature").alive = false;
        let near = arena.insert(sample_creature(2, 2));

        assert_eq!(arena.nearest_living(0.0, 0.0, 20.0), Some(near));
        assert_eq!(arena.nearest_living(0.0, 0.0, 1.0), None);
        assert_eq!(arena.nearest_living(8.0, 8.0, 1.0), Some(far));
    }

    #[test]
    fn config_validation_rejects_bad_values() {
        let bad_fraction = EngineConfig {
            reproduction_energy_fraction: 1.4,
            ..EngineConfig::default()
        };
        assert!(SimulationState::new(bad_fraction).is_err());

        let zero_compaction = EngineConfig {
            compaction_interval: 0,
            ..EngineConfig::default()
        };
        assert!(SimulationState::new(zero_compaction).is_err());

        let negative_weight = EngineConfig {
            predation_aggression_weight: -0.1,
            ..EngineConfig::default()
        };
        assert!(SimulationState::new(negative_weight).is_err());
    }

    #[test]
    fn zero_area_world_is_valid_and_steppable() {
        let config = EngineConfig {
            world_width: 0,
            world_height: 0,
            rng_seed: Some(3),
            ..EngineConfig::default()
        };
        let mut sim = SimulationState::new(config).expect("world");
        assert_eq!(sim.alive_count(), 0);
        assert!(sim.terrain().cells().is_empty());
        let events = sim.step();
        assert_eq!(events.step, Step(1));
        assert_eq!(events.births, 0);
    }

    #[test]
    fn spawn_clamps_energy_to_capacity() {
        let mut sim = SimulationState::new(quiet_config()).expect("world");
        let species = sim.add_species(Locomotion::Terrestrial, Diet::Herbivore, false);
        let mut small_stomach = Genome::baseline();
        small_stomach.stomach_capacity = 30.0;
        let id = sim.spawn_creature(species, 1, 1, Sex::Female, small_stomach);
        let creature = sim.creatures().get(id).expect("creature");
        assert_eq!(creature.energy, 30.0);
        assert_eq!(creature.age, 0);
        assert!(creature.alive);
    }

    #[test]
    fn species_table_matches_configured_count() {
        let config = EngineConfig {
            species_count: 3,
            creatures_per_species: 4,
            rng_seed: Some(17),
            world_width: 24,
            world_height: 18,
            ..EngineConfig::default()
        };
        let sim = SimulationState::new(config).expect("world");
        assert_eq!(sim.species_count(), 3);
        assert_eq!(sim.alive_count(), 12);
        for (index, species) in sim.species().iter().enumerate() {
            assert_eq!(species.id, SpeciesId(index as u32));
        }
    }

    #[test]
    fn history_is_bounded_by_capacity() {
        let config = EngineConfig {
            history_capacity: 4,
            summary_interval: 1,
            ..quiet_config()
        };
        let mut sim = SimulationState::new(config).expect("world");
        sim.advance(10);
        let history: Vec<_> = sim.history().collect();
        assert_eq!(history.len(), 4);
        assert_eq!(history.last().expect("summary").step, Step(10));
        assert_eq!(history.first().expect("summary").step, Step(7));
    }

    #[test]
    fn reset_zeroes_clock_and_repopulates() {
        let config = EngineConfig {
            species_count: 2,
            creatures_per_species: 3,
            rng_seed: Some(9),
            world_width: 20,
            world_height: 16,
            ..EngineConfig::default()
        };
        let mut sim = SimulationState::new(config).expect("world");
        sim.advance(12);
        assert!(sim.year() > 0.0);

        sim.reset();
        assert_eq!(sim.current_step(), Step(0));
        assert_eq!(sim.year(), 0.0);
        assert_eq!(sim.species_count(), 2);
        assert_eq!(sim.alive_count(), 6);
        assert_eq!(sim.history().count(), 0);
    }

    #[test]
    fn snapshot_joins_species_fields() {
        let mut sim = SimulationState::new(quiet_config()).expect("world");
        let species = sim.add_species(Locomotion::Aquatic, Diet::Carnivore, true);
        let id = sim.spawn_creature(species, 3, 4, Sex::Male, Genome::baseline());

        let snapshot = sim.snapshot_creature(id).expect("snapshot");
        assert_eq!(snapshot.id, id);
        assert_eq!(snapshot.diet, Diet::Carnivore);
        assert_eq!(snapshot.locomotion, Locomotion::Aquatic);
        assert!(snapshot.cannibal);
        assert_eq!((snapshot.x, snapshot.y), (3, 4));
        assert_eq!(snapshot.sex, Sex::Male);
    }

    #[test]
    fn forage_yields_follow_diet_and_biome() {
        assert_eq!(Diet::Herbivore.forage_yield(Biome::Fields), 1.0);
        assert_eq!(Diet::Herbivore.forage_yield(Biome::Desert), 0.2);
        assert_eq!(Diet::Omnivore.forage_yield(Biome::Woods), 0.7);
        assert_eq!(Diet::Omnivore.forage_yield(Biome::Water), 0.3);
        assert_eq!(Diet::Carnivore.forage_yield(Biome::Swamp), 0.1);
        assert_eq!(Diet::Carnivore.forage_yield(Biome::Snowy), 0.1);
    }
}
