//! Per-creature trait genomes and their mutation/crossover operators.
//!
//! A genome is a flat vector of named numeric and boolean traits; every
//! creature owns an independent copy. `metabolism_rate` is derived from the
//! other traits and recomputed after every mutation, which couples
//! phenotypic investment to upkeep cost.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Chance that a mutation flips one heritable boolean switch.
const BOOL_FLIP_CHANCE: f32 = 0.05;
/// Chance that a mutation perturbs a second numeric trait.
const SECOND_PERTURBATION_CHANCE: f32 = 0.3;
/// Uniform half-width of a single numeric perturbation.
const PERTURBATION_RANGE: f32 = 0.2;
/// Uniform half-width of the variance applied to founder genomes.
const FOUNDER_VARIANCE: f32 = 0.1;

/// Complete heritable trait set of a creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    // body & movement
    pub size: f32,
    pub max_speed: f32,
    pub armor: f32,
    pub attack_damage: f32,
    pub bite_force: f32,
    pub venom_power: f32,
    pub has_venom: bool,
    pub constriction_power: f32,
    pub ram_power: f32,
    pub tail_power: f32,
    pub stomach_capacity: f32,
    // sensory
    pub vision_radius: f32,
    pub field_of_view: f32,
    pub detection_chance: f32,
    pub smell_range: f32,
    pub night_vision: f32,
    // metabolism & survival
    pub metabolism_rate: f32,
    pub food_efficiency: f32,
    pub temperature_tolerance: f32,
    pub toxin_tolerance: f32,
    pub can_hibernate: bool,
    pub disease_chance: f32,
    pub slime_thickness: f32,
    pub shell_hardness: f32,
    // reproduction
    pub offspring_per_cycle: f32,
    pub repro_cooldown: f32,
    pub max_age: f32,
    pub care_level: f32,
    // behavior
    pub aggression: f32,
    pub caution: f32,
    pub curiosity: f32,
    pub grouping: f32,
    pub territoriality: f32,
    pub risk_taking: f32,
    // camouflage
    pub camo: f32,
    pub crypsis: f32,
    pub mimicry: f32,
    pub false_eye_spots: f32,
    // defense
    pub can_burrow: bool,
    pub burrow_speed: f32,
    pub spine_damage: f32,
    pub repellent_strength: f32,
    pub irritant_strength: f32,
    pub can_autotomize: bool,
    pub startle_power: f32,
    // regeneration
    pub regen_rate: f32,
}

/// Numeric traits eligible for random perturbation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumericTrait {
    Size,
    MaxSpeed,
    Armor,
    AttackDamage,
    BiteForce,
    VenomPower,
    ConstrictionPower,
    RamPower,
    TailPower,
    StomachCapacity,
    VisionRadius,
    FieldOfView,
    DetectionChance,
    SmellRange,
    NightVision,
    FoodEfficiency,
    TemperatureTolerance,
    ToxinTolerance,
    DiseaseChance,
    SlimeThickness,
    ShellHardness,
    OffspringPerCycle,
    ReproCooldown,
    CareLevel,
    Aggression,
    Curiosity,
    Camo,
    RegenRate,
}

const MUTABLE_TRAITS: [NumericTrait; 28] = [
    NumericTrait::Size,
    NumericTrait::MaxSpeed,
    NumericTrait::Armor,
    NumericTrait::AttackDamage,
    NumericTrait::BiteForce,
    NumericTrait::VenomPower,
    NumericTrait::ConstrictionPower,
    NumericTrait::RamPower,
    NumericTrait::TailPower,
    NumericTrait::StomachCapacity,
    NumericTrait::VisionRadius,
    NumericTrait::FieldOfView,
    NumericTrait::DetectionChance,
    NumericTrait::SmellRange,
    NumericTrait::NightVision,
    NumericTrait::FoodEfficiency,
    NumericTrait::TemperatureTolerance,
    NumericTrait::ToxinTolerance,
    NumericTrait::DiseaseChance,
    NumericTrait::SlimeThickness,
    NumericTrait::ShellHardness,
    NumericTrait::OffspringPerCycle,
    NumericTrait::ReproCooldown,
    NumericTrait::CareLevel,
    NumericTrait::Aggression,
    NumericTrait::Curiosity,
    NumericTrait::Camo,
    NumericTrait::RegenRate,
];

impl NumericTrait {
    fn get(self, genome: &Genome) -> f32 {
        match self {
            Self::Size => genome.size,
            Self::MaxSpeed => genome.max_speed,
            Self::Armor => genome.armor,
            Self::AttackDamage => genome.attack_damage,
            Self::BiteForce => genome.bite_force,
            Self::VenomPower => genome.venom_power,
            Self::ConstrictionPower => genome.constriction_power,
            Self::RamPower => genome.ram_power,
            Self::TailPower => genome.tail_power,
            Self::StomachCapacity => genome.stomach_capacity,
            Self::VisionRadius => genome.vision_radius,
            Self::FieldOfView => genome.field_of_view,
            Self::DetectionChance => genome.detection_chance,
            Self::SmellRange => genome.smell_range,
            Self::NightVision => genome.night_vision,
            Self::FoodEfficiency => genome.food_efficiency,
            Self::TemperatureTolerance => genome.temperature_tolerance,
            Self::ToxinTolerance => genome.toxin_tolerance,
            Self::DiseaseChance => genome.disease_chance,
            Self::SlimeThickness => genome.slime_thickness,
            Self::ShellHardness => genome.shell_hardness,
            Self::OffspringPerCycle => genome.offspring_per_cycle,
            Self::ReproCooldown => genome.repro_cooldown,
            Self::CareLevel => genome.care_level,
            Self::Aggression => genome.aggression,
            Self::Curiosity => genome.curiosity,
            Self::Camo => genome.camo,
            Self::RegenRate => genome.regen_rate,
        }
    }

    fn set(self, genome: &mut Genome, value: f32) {
        match self {
            Self::Size => genome.size = value,
            Self::MaxSpeed => genome.max_speed = value,
            Self::Armor => genome.armor = value,
            Self::AttackDamage => genome.attack_damage = value,
            Self::BiteForce => genome.bite_force = value,
            Self::VenomPower => genome.venom_power = value,
            Self::ConstrictionPower => genome.constriction_power = value,
            Self::RamPower => genome.ram_power = value,
            Self::TailPower => genome.tail_power = value,
            Self::StomachCapacity => genome.stomach_capacity = value,
            Self::VisionRadius => genome.vision_radius = value,
            Self::FieldOfView => genome.field_of_view = value,
            Self::DetectionChance => genome.detection_chance = value,
            Self::SmellRange => genome.smell_range = value,
            Self::NightVision => genome.night_vision = value,
            Self::FoodEfficiency => genome.food_efficiency = value,
            Self::TemperatureTolerance => genome.temperature_tolerance = value,
            Self::ToxinTolerance => genome.toxin_tolerance = value,
            Self::DiseaseChance => genome.disease_chance = value,
            Self::SlimeThickness => genome.slime_thickness = value,
            Self::ShellHardness => genome.shell_hardness = value,
            Self::OffspringPerCycle => genome.offspring_per_cycle = value,
            Self::ReproCooldown => genome.repro_cooldown = value,
            Self::CareLevel => genome.care_level = value,
            Self::Aggression => genome.aggression = value,
            Self::Curiosity => genome.curiosity = value,
            Self::Camo => genome.camo = value,
            Self::RegenRate => genome.regen_rate = value,
        }
    }

    /// Clamp a candidate value into the viable range for this trait.
    /// Traits without an entry here evolve unclamped.
    fn clamp(self, value: f32) -> f32 {
        match self {
            Self::Size => value.clamp(0.3, 3.0),
            Self::MaxSpeed => value.clamp(0.2, 4.0),
            Self::Armor => value.clamp(0.0, 5.0),
            Self::AttackDamage => value.max(0.1),
            Self::OffspringPerCycle => value.clamp(1.0, 5.0),
            Self::ReproCooldown => value.clamp(80.0, 500.0),
            Self::VisionRadius => value.clamp(3.0, 20.0),
            _ => value,
        }
    }
}

/// Heritable boolean switches eligible for mutation flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoolTrait {
    Venom,
    Hibernation,
    Burrow,
    Autotomy,
}

const BOOL_TRAITS: [BoolTrait; 4] = [
    BoolTrait::Venom,
    BoolTrait::Hibernation,
    BoolTrait::Burrow,
    BoolTrait::Autotomy,
];

impl BoolTrait {
    fn flip(self, genome: &mut Genome) {
        match self {
            Self::Venom => genome.has_venom = !genome.has_venom,
            Self::Hibernation => genome.can_hibernate = !genome.can_hibernate,
            Self::Burrow => genome.can_burrow = !genome.can_burrow,
            Self::Autotomy => genome.can_autotomize = !genome.can_autotomize,
        }
    }
}

impl Genome {
    /// Fixed founder trait set shared by all world-initialization creatures
    /// before per-individual variance is applied.
    #[must_use]
    pub fn baseline() -> Self {
        let mut genome = Self {
            size: 1.0,
            max_speed: 1.0,
            armor: 0.5,
            attack_damage: 1.0,
            bite_force: 0.5,
            venom_power: 0.0,
            has_venom: false,
            constriction_power: 0.0,
            ram_power: 0.0,
            tail_power: 0.0,
            stomach_capacity: 100.0,
            vision_radius: 8.0,
            field_of_view: 180.0,
            detection_chance: 0.5,
            smell_range: 4.0,
            night_vision: 0.2,
            metabolism_rate: 0.0,
            food_efficiency: 1.0,
            temperature_tolerance: 0.5,
            toxin_tolerance: 0.3,
            can_hibernate: false,
            disease_chance: 0.05,
            slime_thickness: 0.0,
            shell_hardness: 0.0,
            offspring_per_cycle: 2.0,
            repro_cooldown: 200.0,
            max_age: 800.0,
            care_level: 0.3,
            aggression: 0.4,
            caution: 0.5,
            curiosity: 0.5,
            grouping: 0.3,
            territoriality: 0.3,
            risk_taking: 0.4,
            camo: 0.2,
            crypsis: 0.1,
            mimicry: 0.0,
            false_eye_spots: 0.0,
            can_burrow: false,
            burrow_speed: 0.0,
            spine_damage: 0.0,
            repellent_strength: 0.0,
            irritant_strength: 0.0,
            can_autotomize: false,
            startle_power: 0.0,
            regen_rate: 0.0,
        };
        genome.refresh_metabolism();
        genome
    }

    /// Baseline genome with a small uniform variance on every mutable
    /// numeric trait, used for founder creatures.
    pub fn founder(rng: &mut dyn RngCore) -> Self {
        let mut genome = Self::baseline();
        for spot in MUTABLE_TRAITS {
            let jittered = spot.get(&genome) + rng.random_range(-FOUNDER_VARIANCE..FOUNDER_VARIANCE);
            spot.set(&mut genome, spot.clamp(jittered));
        }
        genome.refresh_metabolism();
        genome
    }

    /// Phenotypic complexity score feeding the metabolism cost model.
    #[must_use]
    pub fn complexity(&self) -> f32 {
        self.size
            + 0.5 * self.armor
            + 0.3 * self.attack_damage
            + 0.3 * self.max_speed
            + 0.1 * self.vision_radius
            + if self.has_venom { 2.0 } else { 0.0 }
            + 2.0 * self.regen_rate
            + if self.can_burrow { 1.0 } else { 0.0 }
            + if self.can_hibernate { 0.5 } else { 0.0 }
    }

    /// Recompute the derived upkeep cost from the current trait values.
    pub fn refresh_metabolism(&mut self) {
        self.metabolism_rate = 0.02 + 0.003 * self.complexity();
    }

    /// Produce a mutated, independent copy of this genome.
    ///
    /// One boolean switch flips with a small chance; one numeric trait
    /// (sometimes two) receives a uniform perturbation, clamped into its
    /// viable range. The metabolism cost is recomputed last so the
    /// perturbed phenotype pays for itself.
    #[must_use]
    pub fn mutate(&self, rng: &mut dyn RngCore) -> Self {
        let mut child = self.clone();

        if rng.random::<f32>() < BOOL_FLIP_CHANCE {
            BOOL_TRAITS[rng.random_range(0..BOOL_TRAITS.len())].flip(&mut child);
        }

        let perturbations = if rng.random::<f32>() < SECOND_PERTURBATION_CHANCE {
            2
        } else {
            1
        };
        for _ in 0..perturbations {
            let spot = MUTABLE_TRAITS[rng.random_range(0..MUTABLE_TRAITS.len())];
            let shifted = spot.get(&child) + rng.random_range(-PERTURBATION_RANGE..PERTURBATION_RANGE);
            spot.set(&mut child, spot.clamp(shifted));
        }

        child.refresh_metabolism();
        child
    }

    /// Combine two parent genomes: numeric traits average, boolean traits
    /// pick one parent's value uniformly at random.
    #[must_use]
    pub fn crossover(a: &Self, b: &Self, rng: &mut dyn RngCore) -> Self {
        fn avg(x: f32, y: f32) -> f32 {
            (x + y) / 2.0
        }
        let mut pick = |x: bool, y: bool| if rng.random::<bool>() { x } else { y };

        Self {
            size: avg(a.size, b.size),
            max_speed: avg(a.max_speed, b.max_speed),
            armor: avg(a.armor, b.armor),
            attack_damage: avg(a.attack_damage, b.attack_damage),
            bite_force: avg(a.bite_force, b.bite_force),
            venom_power: avg(a.venom_power, b.venom_power),
            has_venom: pick(a.has_venom, b.has_venom),
            constriction_power: avg(a.constriction_power, b.constriction_power),
            ram_power: avg(a.ram_power, b.ram_power),
            tail_power: avg(a.tail_power, b.tail_power),
            stomach_capacity: avg(a.stomach_capacity, b.stomach_capacity),
            vision_radius: avg(a.vision_radius, b.vision_radius),
            field_of_view: avg(a.field_of_view, b.field_of_view),
            detection_chance: avg(a.detection_chance, b.detection_chance),
            smell_range: avg(a.smell_range, b.smell_range),
            night_vision: avg(a.night_vision, b.night_vision),
            metabolism_rate: avg(a.metabolism_rate, b.metabolism_rate),
            food_efficiency: avg(a.food_efficiency, b.food_efficiency),
            temperature_tolerance: avg(a.temperature_tolerance, b.temperature_tolerance),
            toxin_tolerance: avg(a.toxin_tolerance, b.toxin_tolerance),
            can_hibernate: pick(a.can_hibernate, b.can_hibernate),
            disease_chance: avg(a.disease_chance, b.disease_chance),
            slime_thickness: avg(a.slime_thickness, b.slime_thickness),
            shell_hardness: avg(a.shell_hardness, b.shell_hardness),
            offspring_per_cycle: avg(a.offspring_per_cycle, b.offspring_per_cycle),
            repro_cooldown: avg(a.repro_cooldown, b.repro_cooldown),
            max_age: avg(a.max_age, b.max_age),
            care_level: avg(a.care_level, b.care_level),
            aggression: avg(a.aggression, b.aggression),
            caution: avg(a.caution, b.caution),
            curiosity: avg(a.curiosity, b.curiosity),
            grouping: avg(a.grouping, b.grouping),
            territoriality: avg(a.territoriality, b.territoriality),
            risk_taking: avg(a.risk_taking, b.risk_taking),
            camo: avg(a.camo, b.camo),
            crypsis: avg(a.crypsis, b.crypsis),
            mimicry: avg(a.mimicry, b.mimicry),
            false_eye_spots: avg(a.false_eye_spots, b.false_eye_spots),
            can_burrow: pick(a.can_burrow, b.can_burrow),
            burrow_speed: avg(a.burrow_speed, b.burrow_speed),
            spine_damage: avg(a.spine_damage, b.spine_damage),
            repellent_strength: avg(a.repellent_strength, b.repellent_strength),
            irritant_strength: avg(a.irritant_strength, b.irritant_strength),
            can_autotomize: pick(a.can_autotomize, b.can_autotomize),
            startle_power: avg(a.startle_power, b.startle_power),
            regen_rate: avg(a.regen_rate, b.regen_rate),
        }
    }
}
