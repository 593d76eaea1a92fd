/// What the agent sees of the market at one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub price: f64,
    pub balance: f64,
    pub position: u32,
}

impl Observation {
    pub fn new(price: f64, balance: f64, position: u32) -> Self {
        Self {
            price,
            balance,
            position,
        }
    }
}

/// Result of applying one action to an environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
}

impl Snapshot {
    pub fn new(observation: Observation, reward: f64, done: bool) -> Self {
        Self {
            observation,
            reward,
            done,
        }
    }
}
