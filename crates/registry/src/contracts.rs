//! Contract bindings for the name registry, definition resolvers and the
//! domain change notifier.

use alloy::sol;

sol! {
    /// ENS-style registry: node ownership and resolver pointers.
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IDomainRegistry {
        function owner(bytes32 node) external view returns (address);
        function resolver(bytes32 node) external view returns (address);
        function setSubnodeRecord(bytes32 node, bytes32 label, address owner, address resolver, uint64 ttl) external;

        event NewOwner(bytes32 indexed node, bytes32 indexed label, address owner);
    }

    /// Definition resolver. Legacy resolvers only answer `name` and `text`.
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IDefinitionResolver {
        function name(bytes32 node) external view returns (string);
        function text(bytes32 node, string key) external view returns (string);
        function definition(bytes32 node) external view returns (bytes);

        function setName(bytes32 node, string name) external;
        function setText(bytes32 node, string key, string value) external;
        function setDefinition(bytes32 node, bytes data) external;
        function multicall(bytes[] data) external returns (bytes[] results);

        event TextChanged(bytes32 indexed node, string indexed indexedKey, string key);
    }

    /// Emits a notification whenever a domain definition changes.
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IDomainNotifier {
        function domainUpdated(bytes32 node) external;

        event DomainUpdated(bytes32 indexed node);
    }
}
