//! Checked balance arithmetic shared by the registry operations

#[derive(Debug, Clone, PartialEq)]
pub enum BalanceError {
    InsufficientFunds,
    Overflow,
}

/// Balance after debiting `amount`
pub fn debit(balance: u64, amount: u64) -> Result<u64, BalanceError> {
    if balance < amount {
        return Err(BalanceError::InsufficientFunds);
    }
    Ok(balance - amount)
}

/// Balance after crediting `amount`
pub fn credit(balance: u64, amount: u64) -> Result<u64, BalanceError> {
    balance.checked_add(amount).ok_or(BalanceError::Overflow)
}

/// Both legs of a transfer, computed before either is applied
pub fn transfer_legs(
    sender_balance: u64,
    receiver_balance: u64,
    amount: u64,
) -> Result<(u64, u64), BalanceError> {
    let sender_after = debit(sender_balance, amount)?;
    let receiver_after = credit(receiver_balance, amount)?;
    Ok((sender_after, receiver_after))
}
