use ethers::prelude::abigen;

// Generates the bindings for the `FaultDisputeGame` contract.
abigen!(
    FaultDisputeGame,
    r"[
        function attack(uint256 parentIndex, bytes32 pivot) external payable
        function defend(uint256 parentIndex, bytes32 pivot) external payable
        function claimData(uint256 index) external view returns (uint32 parentIndex, bool countered, bytes32 claim, uint128 position, uint128 clock)
        function claimDataLen() external view returns (uint256)
        function status() external view returns (uint8)
        function MAX_GAME_DEPTH() external view returns (uint256)
        function ABSOLUTE_PRESTATE() external view returns (bytes32)
    ]"
);
