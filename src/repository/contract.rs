use alloy::sol;

// Smart contract ABI definitions for chain interactions
sol! {
    /// ERC20 token standard interface.
    ///
    /// Minimal interface containing only the view functions the funding
    /// pipeline needs: balance reads and decimal/symbol discovery for the
    /// stable token and the wrapped native token.
    #[sol(rpc)]
    interface IERC20 {
        /// Returns the token balance of the specified account.
        ///
        /// # Arguments
        /// * `account` - The address to query the balance of
        ///
        /// # Returns
        /// The balance in the token's smallest unit (considering decimals)
        function balanceOf(address account) external view returns (uint256);

        /// Returns the number of decimals used by the token.
        ///
        /// # Returns
        /// The number of decimals (e.g., 18 for most tokens, 6 for USDC)
        function decimals() external view returns (uint8);

        /// Returns the token symbol.
        ///
        /// # Returns
        /// The token symbol as a string (e.g., "USDC", "WETH")
        function symbol() external view returns (string memory);
    }
}
