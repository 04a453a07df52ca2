//! Combat system - target selection and troop-vs-tower strike resolution

use rand::Rng;

use crate::store::TowerRole;

use super::units::{Tower, Troop};

/// Attack multiplier on a critical hit
pub const CRIT_MULTIPLIER: f64 = 1.2;

/// Result of one strike
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    /// Damage dealt, never negative
    pub damage: i32,
    pub critical: bool,
}

/// How a deploy's fight ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatOutcome {
    TowerDestroyed,
    TroopDefeated,
    /// Neither side could ever hurt the other
    Stalemate,
}

/// Attack value after a critical hit
pub fn critical_attack(attack: i32) -> i32 {
    (f64::from(attack) * CRIT_MULTIPLIER) as i32
}

/// Roll a single strike against `defense`
pub fn roll_strike<R: Rng + ?Sized>(
    rng: &mut R,
    attack: i32,
    critical_chance: f64,
    defense: i32,
) -> Strike {
    let critical = rng.gen::<f64>() < critical_chance;
    let attack = if critical {
        critical_attack(attack)
    } else {
        attack
    };

    Strike {
        damage: (attack - defense).max(0),
        critical,
    }
}

/// Whether an attacker could ever get through `defense`, counting crits
fn can_damage(attack: i32, critical_chance: f64, defense: i32) -> bool {
    let best = if critical_chance > 0.0 {
        critical_attack(attack).max(attack)
    } else {
        attack
    };
    best > defense
}

/// Pick the enemy tower to attack: the first live guard, then the first live king
pub fn select_target(towers: &[Tower]) -> Option<usize> {
    let first_alive = |role: TowerRole| {
        towers
            .iter()
            .position(|t| t.role == role && t.is_alive())
    };

    first_alive(TowerRole::Guard).or_else(|| first_alive(TowerRole::King))
}

fn crit_suffix(critical: bool) -> &'static str {
    if critical {
        " (critical hit!)"
    } else {
        ""
    }
}

/// Fight `troop` against `tower` until one of them falls, appending every
/// exchange to `log`. The troop strikes first each round.
pub fn resolve<R: Rng + ?Sized>(
    rng: &mut R,
    owner: &str,
    troop: &mut Troop,
    troop_critical_chance: f64,
    tower: &mut Tower,
    log: &mut Vec<String>,
) -> CombatOutcome {
    if !can_damage(troop.attack, troop_critical_chance, tower.defense)
        && !can_damage(tower.attack, tower.critical_chance, troop.defense)
    {
        log.push(format!(
            "{}'s {} and {} cannot hurt each other, the troop withdraws",
            owner, troop.name, tower.name
        ));
        return CombatOutcome::Stalemate;
    }

    while troop.hp > 0 && tower.hp > 0 {
        let hit = roll_strike(rng, troop.attack, troop_critical_chance, tower.defense);
        if hit.damage > 0 {
            tower.hp -= hit.damage;
            log.push(format!(
                "{}'s {} hits {} for {} damage{}",
                owner,
                troop.name,
                tower.name,
                hit.damage,
                crit_suffix(hit.critical)
            ));
            log.push(format!("{} is down to {} HP", tower.name, tower.hp));
        } else {
            log.push(format!(
                "{}'s {} attacks {} but deals no damage",
                owner, troop.name, tower.name
            ));
        }

        if tower.hp <= 0 {
            log.push(format!("{} has been destroyed!", tower.name));
            return CombatOutcome::TowerDestroyed;
        }

        let counter = roll_strike(rng, tower.attack, tower.critical_chance, troop.defense);
        if counter.damage > 0 {
            troop.hp -= counter.damage;
            log.push(format!(
                "{} strikes back at {} for {} damage{}",
                tower.name,
                troop.name,
                counter.damage,
                crit_suffix(counter.critical)
            ));
            log.push(format!("{} is down to {} HP", troop.name, troop.hp));
        } else {
            log.push(format!(
                "{} strikes back at {} but deals no damage",
                tower.name, troop.name
            ));
        }

        if troop.hp <= 0 {
            log.push(format!("{} has been defeated!", troop.name));
            return CombatOutcome::TroopDefeated;
        }
    }

    if tower.hp <= 0 {
        CombatOutcome::TowerDestroyed
    } else {
        CombatOutcome::TroopDefeated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn troop(name: &str, attack: i32, defense: i32, hp: i32) -> Troop {
        Troop {
            name: name.into(),
            hp,
            attack,
            defense,
            cost: 3,
        }
    }

    fn tower(name: &str, role: TowerRole, hp: i32, attack: i32, defense: i32) -> Tower {
        Tower {
            name: name.into(),
            role,
            hp,
            attack,
            defense,
            critical_chance: 0.0,
        }
    }

    #[test]
    fn thirty_damage_strikes_destroy_tower_in_four_hits() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut knight = troop("Knight", 50, 100, 500);
        let mut guard = tower("Guard Tower", TowerRole::Guard, 100, 10, 20);
        let mut log = Vec::new();

        let outcome = resolve(&mut rng, "alice", &mut knight, 0.0, &mut guard, &mut log);

        assert_eq!(outcome, CombatOutcome::TowerDestroyed);
        assert_eq!(log[0], "alice's Knight hits Guard Tower for 30 damage");
        assert_eq!(log[1], "Guard Tower is down to 70 HP");
        let hits = log.iter().filter(|l| l.contains("for 30 damage")).count();
        assert_eq!(hits, 4);
        assert_eq!(guard.hp, -20);
        assert_eq!(log.last().unwrap(), "Guard Tower has been destroyed!");
        // The tower never gets through DEF 100
        assert_eq!(knight.hp, 500);
    }

    #[test]
    fn zero_damage_strike_is_logged_not_healed() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut pawn = troop("Pawn", 10, 0, 100);
        let mut king = tower("King Tower", TowerRole::King, 50, 60, 40);
        let mut log = Vec::new();

        let outcome = resolve(&mut rng, "bob", &mut pawn, 0.0, &mut king, &mut log);

        assert_eq!(outcome, CombatOutcome::TroopDefeated);
        assert_eq!(king.hp, 50);
        assert_eq!(log[0], "bob's Pawn attacks King Tower but deals no damage");
        assert_eq!(pawn.hp, -20);
        assert_eq!(log.last().unwrap(), "Pawn has been defeated!");
    }

    #[test]
    fn mutual_zero_damage_does_not_loop() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut knight = troop("Knight", 10, 50, 100);
        let mut king = tower("King Tower", TowerRole::King, 100, 10, 50);
        let mut log = Vec::new();

        let outcome = resolve(&mut rng, "alice", &mut knight, 0.0, &mut king, &mut log);

        assert_eq!(outcome, CombatOutcome::Stalemate);
        assert_eq!(log.len(), 1);
        assert_eq!((knight.hp, king.hp), (100, 100));
    }

    #[test]
    fn one_damage_hits_grind_down_a_large_tower() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut rook = troop("Rook", 21, 100, 100);
        let mut king = tower("King Tower", TowerRole::King, 1500, 10, 20);
        let mut log = Vec::new();

        let outcome = resolve(&mut rng, "alice", &mut rook, 0.0, &mut king, &mut log);

        assert_eq!(outcome, CombatOutcome::TowerDestroyed);
        assert_eq!(king.hp, 0);
        assert_eq!(rook.hp, 100);
        assert_eq!(log.last().unwrap(), "King Tower has been destroyed!");
    }

    #[test]
    fn critical_attack_truncates() {
        assert_eq!(critical_attack(50), 60);
        assert_eq!(critical_attack(7), 8);
    }

    #[test]
    fn guaranteed_crit_applies_multiplier() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let strike = roll_strike(&mut rng, 50, 1.0, 20);
        assert_eq!(strike, Strike { damage: 40, critical: true });

        let strike = roll_strike(&mut rng, 50, 0.0, 60);
        assert_eq!(strike, Strike { damage: 0, critical: false });
    }

    #[test]
    fn guards_are_targeted_before_the_king() {
        let mut towers = vec![
            tower("King Tower", TowerRole::King, 100, 0, 0),
            tower("Guard Tower", TowerRole::Guard, 0, 0, 0),
            tower("Guard Tower", TowerRole::Guard, 10, 0, 0),
            tower("Guard Tower", TowerRole::Guard, 10, 0, 0),
        ];
        assert_eq!(select_target(&towers), Some(2));

        towers[2].hp = -4;
        towers[3].hp = 0;
        assert_eq!(select_target(&towers), Some(0));

        towers[0].hp = 0;
        assert_eq!(select_target(&towers), None);
        assert_eq!(select_target(&[]), None);
    }

    #[test]
    fn untargetable_towers_are_skipped() {
        let towers = vec![tower("Wall", TowerRole::Other, 100, 0, 0)];
        assert_eq!(select_target(&towers), None);
    }
}
