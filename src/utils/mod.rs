pub mod authorization;
pub mod telegram_init_data;

#[cfg(test)]
pub mod test_app_state;
#[cfg(test)]
pub mod test_wallet;
