use tracing::trace;

use crate::{
    constants::env::MIN_PRICES,
    error::{Result, TradingError},
    gym::{Action, Environment, Observation, Snapshot},
    types::Data,
};

/// Single-instrument market replaying a fixed price series, one share per trade.
#[derive(Debug, Clone)]
pub struct MarketEnv {
    prices: Data,
    initial_balance: f64,
    transaction_cost: f64,
    balance: f64,
    position: u32,
    current_step: usize,
    last_portfolio_value: f64,
}

impl MarketEnv {
    pub fn new(prices: Data, initial_balance: f64, transaction_cost: f64) -> Result<Self> {
        if prices.len() < MIN_PRICES {
            return Err(TradingError::InvalidInput(format!(
                "need at least {MIN_PRICES} prices, got {}",
                prices.len()
            )));
        }
        if let Some(bad) = prices.iter().find(|price| !price.is_finite() || **price <= 0.0) {
            return Err(TradingError::InvalidInput(format!(
                "prices must be finite and positive, found {bad}"
            )));
        }
        if !initial_balance.is_finite() || initial_balance <= 0.0 {
            return Err(TradingError::InvalidInput(format!(
                "initial balance must be positive, got {initial_balance}"
            )));
        }
        // A fee of the whole price or more would make selling cost money
        if !(0.0..1.0).contains(&transaction_cost) {
            return Err(TradingError::InvalidInput(format!(
                "transaction cost must be a fraction in [0, 1), got {transaction_cost}"
            )));
        }

        let mut env = Self {
            prices,
            initial_balance,
            transaction_cost,
            balance: initial_balance,
            position: 0,
            current_step: 0,
            last_portfolio_value: initial_balance,
        };
        env.reset();
        Ok(env)
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    /// Steps in one episode
    pub fn horizon(&self) -> usize {
        self.prices.len()
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn is_done(&self) -> bool {
        self.current_step >= self.horizon()
    }

    fn observation_at(&self, step: usize) -> Observation {
        let index = step.min(self.prices.len() - 1);
        Observation::new(self.prices[index], self.balance, self.position)
    }

    fn buy(&mut self, price: f64) -> bool {
        let cost = price * (1.0 + self.transaction_cost);
        if self.balance < cost {
            return false;
        }
        self.balance -= cost;
        self.position += 1;
        true
    }

    fn sell(&mut self, price: f64) -> bool {
        if self.position == 0 {
            return false;
        }
        self.balance += price * (1.0 - self.transaction_cost);
        self.position -= 1;
        true
    }
}

impl Environment for MarketEnv {
    fn reset(&mut self) -> Observation {
        self.balance = self.initial_balance;
        self.position = 0;
        self.current_step = 0;
        self.last_portfolio_value = self.initial_balance;
        self.observation_at(0)
    }

    fn step(&mut self, action: Action) -> Result<Snapshot> {
        if self.is_done() {
            return Err(TradingError::InvalidInput(
                "episode already finished, reset before stepping".to_string(),
            ));
        }

        let price = self.prices[self.current_step];
        let executed = match action {
            Action::Buy => self.buy(price),
            Action::Sell => self.sell(price),
            Action::Hold => true,
        };
        if !executed {
            trace!(step = self.current_step, %action, price, "trade rejected");
        }

        let current_value = self.balance + self.position as f64 * price;
        let reward = current_value - self.last_portfolio_value;
        self.last_portfolio_value = current_value;

        self.current_step += 1;
        let done = self.is_done();

        // Past the end the observation repeats the last price
        Ok(Snapshot::new(
            self.observation_at(self.current_step),
            reward,
            done,
        ))
    }

    /// Valued at the price of the most recently executed step
    fn portfolio_value(&self) -> f64 {
        self.last_portfolio_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_env() -> MarketEnv {
        MarketEnv::new(vec![10.0, 11.0, 9.0, 12.0], 100.0, 0.0).unwrap()
    }

    #[test]
    fn reset_returns_first_price_and_initial_state() {
        let mut env = scenario_env();
        env.step(Action::Buy).unwrap();

        let obs = env.reset();

        assert_eq!(obs, Observation::new(10.0, 100.0, 0));
        assert_eq!(env.current_step(), 0);
        assert_eq!(env.portfolio_value(), 100.0);
    }

    #[test]
    fn buy_hold_sell_hold_scenario() {
        let mut env = scenario_env();
        env.reset();

        let actions = [Action::Buy, Action::Hold, Action::Sell, Action::Hold];
        let expected = [
            (90.0, 1, 0.0, false),
            (90.0, 1, 1.0, false),
            (99.0, 0, -2.0, false),
            (99.0, 0, 0.0, true),
        ];

        let mut total_reward = 0.0;
        for (action, (balance, position, reward, done)) in actions.into_iter().zip(expected) {
            let snapshot = env.step(action).unwrap();
            assert_eq!(env.balance(), balance);
            assert_eq!(env.position(), position);
            assert_eq!(snapshot.reward, reward);
            assert_eq!(snapshot.done, done);
            total_reward += snapshot.reward;
        }

        assert_eq!(env.balance(), 99.0);
        assert_eq!(env.current_step(), 4);
        assert_eq!(total_reward, -1.0);
        assert_eq!(env.portfolio_value() - env.initial_balance(), -1.0);
    }

    #[test]
    fn observation_tracks_next_price_until_done() {
        let mut env = scenario_env();
        env.reset();

        let first = env.step(Action::Buy).unwrap();
        assert_eq!(first.observation, Observation::new(11.0, 90.0, 1));

        env.step(Action::Hold).unwrap();
        env.step(Action::Hold).unwrap();
        let last = env.step(Action::Hold).unwrap();
        assert!(last.done);
        assert_eq!(last.observation, Observation::new(12.0, 90.0, 1));
    }

    #[test]
    fn buy_without_funds_is_rejected() {
        let mut env = MarketEnv::new(vec![60.0, 60.0, 60.0], 100.0, 0.0).unwrap();
        env.reset();

        env.step(Action::Buy).unwrap();
        assert_eq!((env.balance(), env.position()), (40.0, 1));

        let snapshot = env.step(Action::Buy).unwrap();
        assert_eq!((env.balance(), env.position()), (40.0, 1));
        assert_eq!(snapshot.reward, 0.0);
        assert_eq!(env.current_step(), 2);
    }

    #[test]
    fn sell_without_position_is_rejected() {
        let mut env = scenario_env();
        env.reset();

        let snapshot = env.step(Action::Sell).unwrap();

        assert_eq!((env.balance(), env.position()), (100.0, 0));
        assert_eq!(snapshot.reward, 0.0);
    }

    #[test]
    fn transaction_cost_applies_to_both_sides() {
        let mut env = MarketEnv::new(vec![10.0, 10.0], 100.0, 0.1).unwrap();
        env.reset();

        env.step(Action::Buy).unwrap();
        assert!((env.balance() - 89.0).abs() < 1e-12);

        env.step(Action::Sell).unwrap();
        assert!((env.balance() - 98.0).abs() < 1e-12);
    }

    #[test]
    fn cost_inclusive_buy_needs_enough_cash() {
        let mut env = MarketEnv::new(vec![100.0, 100.0], 100.0, 0.01).unwrap();
        env.reset();

        env.step(Action::Buy).unwrap();

        assert_eq!((env.balance(), env.position()), (100.0, 0));
    }

    #[test]
    fn stepping_past_the_end_is_an_error() {
        let mut env = MarketEnv::new(vec![1.0, 2.0], 10.0, 0.0).unwrap();
        env.reset();
        env.step(Action::Hold).unwrap();
        assert!(env.step(Action::Hold).unwrap().done);

        assert!(matches!(
            env.step(Action::Hold),
            Err(TradingError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_invalid_construction() {
        assert!(MarketEnv::new(vec![10.0], 100.0, 0.0).is_err());
        assert!(MarketEnv::new(vec![10.0, 11.0], 0.0, 0.0).is_err());
        assert!(MarketEnv::new(vec![10.0, -1.0], 100.0, 0.0).is_err());
        assert!(MarketEnv::new(vec![10.0, f64::NAN], 100.0, 0.0).is_err());
        assert!(MarketEnv::new(vec![10.0, 11.0], 100.0, -0.5).is_err());
        assert!(MarketEnv::new(vec![10.0, 11.0], 100.0, 1.0).is_err());
    }

    #[test]
    fn horizon_is_one_step_per_price() {
        let mut env = scenario_env();
        assert_eq!(env.horizon(), 4);

        for _ in 0..env.horizon() {
            env.step(Action::Hold).unwrap();
        }
        assert!(env.is_done());
    }
}
